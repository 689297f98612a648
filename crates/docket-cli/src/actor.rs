//! Actor identity for mutating commands.
//!
//! Resolution: `--actor` flag > `DOCKET_ACTOR` env > `USER` env (TTY only).
//! Read-only commands work without one.

use docket_core::PersonId;
use std::env;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorResolutionError {
    pub message: String,
    pub code: &'static str,
}

impl std::fmt::Display for ActorResolutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ActorResolutionError {}

/// Environment access, swapped out in tests.
trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
    fn is_tty(&self) -> bool;
}

struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.is_empty())
    }

    fn is_tty(&self) -> bool {
        use std::io::IsTerminal;
        std::io::stdin().is_terminal()
    }
}

fn resolve_actor_with(cli_flag: Option<&str>, env: &dyn EnvReader) -> Option<String> {
    if let Some(actor) = cli_flag.filter(|a| !a.is_empty()) {
        return Some(actor.to_string());
    }
    if let Some(val) = env.get("DOCKET_ACTOR") {
        return Some(val);
    }
    if env.is_tty() {
        return env.get("USER");
    }
    None
}

pub fn resolve_actor(cli_flag: Option<&str>) -> Option<String> {
    resolve_actor_with(cli_flag, &RealEnv)
}

/// Actor for a mutating command, or an error naming how to set one.
pub fn require_actor(cli_flag: Option<&str>) -> Result<PersonId, ActorResolutionError> {
    resolve_actor(cli_flag)
        .map(PersonId::new)
        .ok_or_else(|| ActorResolutionError {
            message: "Actor identity required for this command. Set --actor or DOCKET_ACTOR."
                .to_string(),
            code: "missing_actor",
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MockEnv {
        vars: HashMap<String, String>,
        tty: bool,
    }

    impl MockEnv {
        fn new() -> Self {
            Self {
                vars: HashMap::new(),
                tty: false,
            }
        }

        fn var(mut self, key: &str, val: &str) -> Self {
            self.vars.insert(key.to_string(), val.to_string());
            self
        }

        const fn tty(mut self, tty: bool) -> Self {
            self.tty = tty;
            self
        }
    }

    impl EnvReader for MockEnv {
        fn get(&self, key: &str) -> Option<String> {
            self.vars.get(key).filter(|v| !v.is_empty()).cloned()
        }

        fn is_tty(&self) -> bool {
            self.tty
        }
    }

    #[test]
    fn flag_wins() {
        let env = MockEnv::new().var("DOCKET_ACTOR", "env-ad").var("USER", "me").tty(true);
        assert_eq!(resolve_actor_with(Some("flag-ad"), &env).as_deref(), Some("flag-ad"));
    }

    #[test]
    fn empty_flag_falls_through_to_env() {
        let env = MockEnv::new().var("DOCKET_ACTOR", "env-ad");
        assert_eq!(resolve_actor_with(Some(""), &env).as_deref(), Some("env-ad"));
    }

    #[test]
    fn user_only_on_a_tty() {
        let piped = MockEnv::new().var("USER", "me");
        assert_eq!(resolve_actor_with(None, &piped), None);
        let tty = MockEnv::new().var("USER", "me").tty(true);
        assert_eq!(resolve_actor_with(None, &tty).as_deref(), Some("me"));
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let env = MockEnv::new().var("DOCKET_ACTOR", "").var("USER", "me").tty(true);
        assert_eq!(resolve_actor_with(None, &env).as_deref(), Some("me"));
    }
}
