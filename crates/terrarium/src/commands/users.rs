//! Account commands: `whoami`, `users`, `useradd`, `userdel`,
//! `passwd`, `login`, `logout`.
//!
//! Passwords are only ever collected through hidden prompts, so they
//! never appear in the submitted line, the history, or the screen.

use async_trait::async_trait;
use tracing::info;

use crate::error::{Error, Result};
use crate::exec::{
    ArgCount, CommandAction, CommandSpec, ExecOutcome, FlagSpec, Invocation, PendingAction,
    PromptRequest,
};
use crate::session::users::{home_dir, valid_name, GUEST, SUPERUSER};

use super::Command;

static WHOAMI_SPEC: CommandSpec = CommandSpec {
    name: "whoami",
    summary: "print the active user",
    usage: "whoami",
    flags: &[],
    args: ArgCount::Exactly(0),
    paths: &[],
};

/// `whoami` - the active user's name.
pub struct Whoami;

#[async_trait]
impl Command for Whoami {
    fn spec(&self) -> &'static CommandSpec {
        &WHOAMI_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        Ok(CommandAction::done(ExecOutcome::ok(format!(
            "{}\n",
            invocation.user
        ))))
    }
}

static USERS_SPEC: CommandSpec = CommandSpec {
    name: "users",
    summary: "list registered users",
    usage: "users",
    flags: &[],
    args: ArgCount::Exactly(0),
    paths: &[],
};

/// `users` - every registered account, one per line.
pub struct Users;

#[async_trait]
impl Command for Users {
    fn spec(&self) -> &'static CommandSpec {
        &USERS_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        let mut listing = String::new();
        for name in invocation.users().names() {
            listing.push_str(&name);
            listing.push('\n');
        }
        Ok(CommandAction::done(ExecOutcome::ok(listing)))
    }
}

static USERADD_SPEC: CommandSpec = CommandSpec {
    name: "useradd",
    summary: "register a user and create their home",
    usage: "useradd NAME",
    flags: &[],
    args: ArgCount::Exactly(1),
    paths: &[],
};

/// `useradd` - registers a passwordless account and gives it a home
/// directory. Root only.
pub struct Useradd;

#[async_trait]
impl Command for Useradd {
    fn spec(&self) -> &'static CommandSpec {
        &USERADD_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        if invocation.user != SUPERUSER {
            return Err(Error::validation("useradd", "requires superuser"));
        }
        let name = &invocation.args[0];
        if !valid_name(name) {
            return Err(Error::validation(
                "useradd",
                format!("invalid user name: {name}"),
            ));
        }
        if !invocation.users().register(name) {
            return Err(Error::validation("useradd", format!("user exists: {name}")));
        }
        let home = home_dir(name);
        invocation.vfs().create_dir_all(&home, SUPERUSER)?;
        invocation.vfs().chown(&home, SUPERUSER, name)?;
        invocation
            .world()
            .persist
            .save_credentials(invocation.users())
            .await?;
        info!(user = %name, "account created");
        Ok(CommandAction::done(ExecOutcome::ok(format!(
            "user {name} created\n"
        ))))
    }
}

static USERDEL_SPEC: CommandSpec = CommandSpec {
    name: "userdel",
    summary: "remove a user",
    usage: "userdel [-f] NAME",
    flags: &[FlagSpec {
        long: "force",
        short: Some('f'),
        takes_value: false,
    }],
    args: ArgCount::Exactly(1),
    paths: &[],
};

/// `userdel` - drops an account and its saved sessions; `-f` also
/// deletes the home directory. Root only; root and guest stay.
pub struct Userdel;

#[async_trait]
impl Command for Userdel {
    fn spec(&self) -> &'static CommandSpec {
        &USERDEL_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        if invocation.user != SUPERUSER {
            return Err(Error::validation("userdel", "requires superuser"));
        }
        let name = &invocation.args[0];
        if name == SUPERUSER || name == GUEST {
            return Err(Error::validation(
                "userdel",
                format!("cannot remove built-in user: {name}"),
            ));
        }
        if !invocation.users().remove(name) {
            return Err(Error::validation("userdel", format!("no such user: {name}")));
        }
        invocation.world().sessions.clear(name).await?;
        if invocation.has_flag("force") {
            invocation
                .vfs()
                .remove(&home_dir(name), SUPERUSER, true, true)?;
        }
        invocation
            .world()
            .persist
            .save_credentials(invocation.users())
            .await?;
        info!(user = %name, "account removed");
        Ok(CommandAction::done(ExecOutcome::ok(format!(
            "user {name} removed\n"
        ))))
    }
}

static PASSWD_SPEC: CommandSpec = CommandSpec {
    name: "passwd",
    summary: "set a password",
    usage: "passwd [NAME]",
    flags: &[],
    args: ArgCount::Between(0, 1),
    paths: &[],
};

/// `passwd` - asks for a new password through a hidden prompt. Anyone
/// may change their own; root may name anyone.
pub struct Passwd;

#[async_trait]
impl Command for Passwd {
    fn spec(&self) -> &'static CommandSpec {
        &PASSWD_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        let target = invocation
            .args
            .first()
            .cloned()
            .unwrap_or_else(|| invocation.user.clone());
        if target != invocation.user && invocation.user != SUPERUSER {
            return Err(Error::validation(
                "passwd",
                "may only change your own password",
            ));
        }
        if !invocation.users().exists(&target) {
            return Err(Error::validation(
                "passwd",
                format!("no such user: {target}"),
            ));
        }
        if !invocation.interactive {
            return Err(Error::validation("passwd", "requires an interactive prompt"));
        }
        Ok(CommandAction::prompt(
            PromptRequest::hidden(format!("new password for {target}: ")),
            PendingAction::NewPassword { user: target },
        ))
    }
}

static LOGIN_SPEC: CommandSpec = CommandSpec {
    name: "login",
    summary: "switch to another user",
    usage: "login NAME",
    flags: &[],
    args: ArgCount::Exactly(1),
    paths: &[],
};

/// `login` - switches users. Accounts with a stored password hash are
/// asked for it; accounts without one are never given one here and
/// switch straight away.
pub struct Login;

#[async_trait]
impl Command for Login {
    fn spec(&self) -> &'static CommandSpec {
        &LOGIN_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        let name = &invocation.args[0];
        if !invocation.users().exists(name) {
            return Err(Error::validation("login", format!("no such user: {name}")));
        }
        if *name == invocation.user {
            return Ok(CommandAction::done(ExecOutcome::notice(format!(
                "already logged in as {name}\n"
            ))));
        }
        if !invocation.users().has_password(name) {
            invocation.exec.switch_user(name).await?;
            return Ok(CommandAction::done(ExecOutcome::ok(format!(
                "logged in as {name}\n"
            ))));
        }
        if !invocation.interactive {
            return Err(Error::validation("login", "requires an interactive prompt"));
        }
        Ok(CommandAction::prompt(
            PromptRequest::hidden(format!("password for {name}: ")),
            PendingAction::LoginPassword { user: name.clone() },
        ))
    }
}

static LOGOUT_SPEC: CommandSpec = CommandSpec {
    name: "logout",
    summary: "return to the guest user",
    usage: "logout",
    flags: &[],
    args: ArgCount::Exactly(0),
    paths: &[],
};

/// `logout` - back to guest. No password involved in that direction.
pub struct Logout;

#[async_trait]
impl Command for Logout {
    fn spec(&self) -> &'static CommandSpec {
        &LOGOUT_SPEC
    }

    async fn run(&self, invocation: Invocation) -> Result<CommandAction> {
        if invocation.user == GUEST {
            return Err(Error::validation("logout", "not logged in"));
        }
        invocation.exec.switch_user(GUEST).await?;
        Ok(CommandAction::done(ExecOutcome::ok("logged out\n")))
    }
}
