use anyhow::Context;
use serde::de::DeserializeOwned;
use shell_quote::QuoteInto;
use std::{marker::PhantomData, process::Command};
use tracing::debug;

pub trait OutputType: Sized {
    fn parse(output: Vec<u8>) -> anyhow::Result<Self>;
}

/// For commands run only for their side effect.
impl OutputType for () {
    fn parse(_: Vec<u8>) -> anyhow::Result<Self> {
        Ok(())
    }
}

#[allow(dead_code)]
pub struct RawOutput {
    pub output: Vec<u8>,
}
impl OutputType for RawOutput {
    fn parse(output: Vec<u8>) -> anyhow::Result<Self> {
        Ok(Self { output })
    }
}

pub struct StringOutput {
    pub output: String,
}
impl OutputType for StringOutput {
    fn parse(output: Vec<u8>) -> anyhow::Result<Self> {
        Ok(Self {
            output: String::from_utf8(output)?,
        })
    }
}

pub struct ParseableOutput<T> {
    pub output: T,
}
impl<T: DeserializeOwned> OutputType for ParseableOutput<T> {
    fn parse(output: Vec<u8>) -> anyhow::Result<Self> {
        Ok(Self {
            output: serde_json::from_slice::<T>(&output)?,
        })
    }
}

pub trait Runnable<Output: OutputType> {
    /// Run the command and deserialise the output.
    fn run(&mut self) -> anyhow::Result<Output>;
}

/// A `std::process::Command` along with a type hint about what data should be output.
pub struct TypedCommand<Output> {
    command: Command,
    t: PhantomData<Output>,
}
impl<Output: OutputType> TypedCommand<Output> {
    pub fn new<S: AsRef<std::ffi::OsStr>>(program: S) -> Self {
        Self {
            command: std::process::Command::new(program),
            t: PhantomData,
        }
    }

    pub fn arg<S: AsRef<std::ffi::OsStr>>(&mut self, arg: S) -> &mut Command {
        self.command.arg(arg)
    }
    pub fn args<I, S>(&mut self, args: I) -> &mut Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        self.command.args(args)
    }

    pub fn get_program(&self) -> &std::ffi::OsStr {
        self.command.get_program()
    }
    pub fn get_args(&self) -> std::process::CommandArgs<'_> {
        self.command.get_args()
    }

    /// Run the command purely for its exit status. A non-zero exit is an
    /// ordinary `false`; only failing to run the command at all is an error.
    pub fn succeeds(&mut self) -> anyhow::Result<bool> {
        debug!("PROBE: `{}`", self);
        let output = self
            .command
            .output()
            .with_context(|| format!("failed to run `{}`", self))?;
        Ok(output.status.success())
    }
}
impl<Output: OutputType> Runnable<Output> for TypedCommand<Output> {
    fn run(&mut self) -> anyhow::Result<Output> {
        debug!("RUN: `{}`", self);

        let output = self
            .command
            .output()
            .with_context(|| format!("failed to run `{}`", self))?;
        if !output.status.success() {
            anyhow::bail!(
                "running command failed with {:?}: `{}`\nStdout:\n{}\nStderr:\n{}",
                output.status.code(),
                self,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr),
            );
        }
        Output::parse(output.stdout)
    }
}
impl<Output> std::fmt::Display for TypedCommand<Output> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = std::ffi::OsString::new();
        s.push(self.command.get_program());
        for arg in self.command.get_args() {
            s.push(" ");
            shell_quote::Sh::quote_into(arg, &mut s);
        }
        f.write_str(&String::from_utf8_lossy(s.as_encoded_bytes()))
    }
}

/// Two commands glued together stdout-to-stdin, like `from | to` in a shell.
pub struct PipedCommand<Ot> {
    from: TypedCommand<RawOutput>,
    to: TypedCommand<Ot>,
}
impl<Ot> PipedCommand<Ot> {
    pub fn new(from: TypedCommand<RawOutput>, to: TypedCommand<Ot>) -> Self {
        PipedCommand { from, to }
    }
}
impl<Ot: OutputType> Runnable<Ot> for PipedCommand<Ot> {
    fn run(&mut self) -> anyhow::Result<Ot> {
        debug!("PIPE: `{}`", self);

        let mut sender = self
            .from
            .command
            .stdout(std::process::Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.from))?;
        let sender_stdout = sender
            .stdout
            .take()
            .context("failed to get child process stdout")?;
        self.to.command.stdin(std::process::Stdio::from(sender_stdout));

        let received = self.to.run();
        if received.is_err() {
            // The receiver bailed; the sender may be blocked on a full pipe.
            let _ = sender.kill();
        }
        let sender_status = sender.wait().context("failed to wait for the sender")?;
        let received = received?;
        if !sender_status.success() {
            anyhow::bail!(
                "sender exited with {:?} after the receiver finished: `{}`",
                sender_status.code(),
                self.from,
            );
        }
        Ok(received)
    }
}
impl<Tt> std::fmt::Display for PipedCommand<Tt> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{} | {}", self.from, self.to))
    }
}
