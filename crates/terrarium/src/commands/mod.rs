//! Built-in commands.
//!
//! Each command implements [`Command`]: a declarative [`CommandSpec`]
//! naming its flags, argument count, and path roles, plus the handler
//! body that runs once the executor has validated all of that. Custom
//! commands register through
//! [`TerrariumBuilder::command`](crate::TerrariumBuilder::command).

mod control;
mod fileops;
mod navigation;
mod output;
mod sessions;
mod text;
mod users;

pub use control::{Delay, Jobs, Run};
pub use fileops::{Chmod, Chown, Cp, Mkdir, Mv, Rm, Touch};
pub use navigation::{Cd, Ls, Pwd};
pub use output::{Clear, Echo, Help, History};
pub use sessions::{Load, Save};
pub use text::{Cat, Grep, Head, Tail, Wc};
pub use users::{Login, Logout, Passwd, Useradd, Userdel, Users, Whoami};

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::exec::{CommandAction, CommandSpec, Invocation};

/// Trait for command implementations.
///
/// Requires `Send + Sync`; handlers run inside the executor's async
/// context and may be shared across clones of it.
#[async_trait]
pub trait Command: Send + Sync {
    /// The command's declarative contract.
    fn spec(&self) -> &'static CommandSpec;

    /// Core logic, invoked with validated flags, arguments, and paths.
    async fn run(&self, invocation: Invocation) -> Result<CommandAction>;
}

/// Name-to-handler table consulted by the executor. Iteration order is
/// alphabetical, which `help` relies on.
pub struct Registry {
    commands: BTreeMap<&'static str, Box<dyn Command>>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry {
            commands: BTreeMap::new(),
        }
    }

    /// A registry holding every built-in.
    pub fn with_defaults() -> Registry {
        let mut registry = Registry::new();
        registry.register(Box::new(Help));
        registry.register(Box::new(Echo));
        registry.register(Box::new(History));
        registry.register(Box::new(Clear));
        registry.register(Box::new(Cat));
        registry.register(Box::new(Head));
        registry.register(Box::new(Tail));
        registry.register(Box::new(Grep));
        registry.register(Box::new(Wc));
        registry.register(Box::new(Mkdir));
        registry.register(Box::new(Touch));
        registry.register(Box::new(Rm));
        registry.register(Box::new(Mv));
        registry.register(Box::new(Cp));
        registry.register(Box::new(Chmod));
        registry.register(Box::new(Chown));
        registry.register(Box::new(Ls));
        registry.register(Box::new(Pwd));
        registry.register(Box::new(Cd));
        registry.register(Box::new(Whoami));
        registry.register(Box::new(Users));
        registry.register(Box::new(Useradd));
        registry.register(Box::new(Userdel));
        registry.register(Box::new(Passwd));
        registry.register(Box::new(Login));
        registry.register(Box::new(Logout));
        registry.register(Box::new(Save));
        registry.register(Box::new(Load));
        registry.register(Box::new(Run));
        registry.register(Box::new(Jobs));
        registry.register(Box::new(Delay));
        registry
    }

    /// Register a command under its declared name, replacing any
    /// earlier registration of the same name.
    pub fn register(&mut self, command: Box<dyn Command>) {
        self.commands.insert(command.spec().name, command);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands.get(name).map(|command| command.as_ref())
    }

    pub fn specs(&self) -> impl Iterator<Item = &'static CommandSpec> + '_ {
        self.commands.values().map(|command| command.spec())
    }
}

impl Default for Registry {
    fn default() -> Registry {
        Registry::with_defaults()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use crate::config::Config;
    use crate::exec::{Executor, LineEvent, World};
    use crate::session::users::GUEST;
    use crate::store::{MemoryStore, DEFAULT_QUOTA_BYTES};

    use super::Registry;

    /// Fresh executor over an in-memory store, seeded with the default
    /// tree, guest active in its home directory.
    pub(crate) fn sandbox() -> Executor {
        let world = World::new(
            Arc::new(MemoryStore::new()),
            DEFAULT_QUOTA_BYTES,
            Config::default(),
        );
        crate::seed_tree(&world.vfs).expect("seeding a fresh tree");
        world.set_cwd(&crate::session::users::home_dir(GUEST));
        Executor::new(world, Registry::with_defaults())
    }

    /// Run one line that must succeed; returns its output.
    pub(crate) async fn run_ok(exec: &Executor, line: &str) -> String {
        match exec.run_line(line, false).await {
            Ok(LineEvent::Finished(outcome)) => {
                assert!(outcome.ok, "line reported failure: {line}");
                outcome.output
            }
            Ok(LineEvent::Idle) => String::new(),
            Ok(LineEvent::Asked(request)) => panic!("unexpected prompt: {}", request.message),
            Err(failure) => panic!("line failed: {}", failure.render()),
        }
    }

    /// Run one line that must fail; returns the rendered message.
    pub(crate) async fn run_err(exec: &Executor, line: &str) -> String {
        match exec.run_line(line, false).await {
            Err(failure) => failure.render(),
            Ok(_) => panic!("line unexpectedly succeeded: {line}"),
        }
    }

    /// Run one line that must suspend on a prompt; returns its message.
    pub(crate) async fn run_prompt(exec: &Executor, line: &str) -> String {
        match exec.run_line(line, false).await {
            Ok(LineEvent::Asked(request)) => request.message,
            Ok(_) => panic!("line did not prompt: {line}"),
            Err(failure) => panic!("line failed: {}", failure.render()),
        }
    }
}
