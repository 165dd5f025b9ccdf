//! The interactive loop: prompt, read a token, run its handler, repeat.
//!
//! The dispatcher owns the session state and the engine gateway, and talks
//! to the user through any `BufRead`/`Write` pair, which is how the tests
//! drive it without a terminal or a running engine.

use std::io::{BufRead, Write};

use tracing::{debug, info, warn};

use crate::Result;
use crate::command::{COMMANDS, Command, TokenReader, interpret};
use crate::engine::{EngineGateway, HandleScope, ResultCode};
use crate::state::{ConnectionState, ENGINE_HOST, Endpoint};

pub const PROMPT: &str = "EmotivServos01> ";

/// Times each result code is echoed by `ler`.
const ECHO_REPEAT: usize = 10;

/// What the loop does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Dispatcher<G, R, W> {
    gateway: G,
    state: ConnectionState,
    input: TokenReader<R>,
    out: W,
}

impl<G: EngineGateway, R: BufRead, W: Write> Dispatcher<G, R, W> {
    pub fn new(gateway: G, input: R, out: W) -> Self {
        Self {
            gateway,
            state: ConnectionState::new(),
            input: TokenReader::new(input),
            out,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Prints the banner and runs commands until `exit` or end of input.
    pub fn run(&mut self) -> Result<()> {
        self.say("\nStarting application...")?;
        self.say(
            "\nWelcome! Type a command, or type 'help' for the list of available commands",
        )?;
        while self.step()? == Flow::Continue {}
        Ok(())
    }

    /// Prompts once and runs the command typed. End of input counts as
    /// `exit`.
    pub fn step(&mut self) -> Result<Flow> {
        self.prompt()?;
        let command = match self.input.next_token()? {
            Some(token) => interpret(&token),
            None => {
                debug!("input closed");
                Command::Exit
            }
        };
        self.execute(command)
    }

    pub fn execute(&mut self, command: Command) -> Result<Flow> {
        debug!(?command, "dispatching command");
        match command {
            Command::Empty => {}
            Command::Help => self.show_commands()?,
            Command::Connect => self.connect()?,
            Command::Disconnect => self.disconnect()?,
            Command::ReadState => self.read_state()?,
            Command::Exit => {
                self.disconnect()?;
                self.say("\nShutting down. See you!\n\n")?;
                return Ok(Flow::Exit);
            }
            Command::Invalid => self.invalid_command()?,
        }
        Ok(Flow::Continue)
    }

    fn say(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "{line}")?;
        Ok(())
    }

    fn prompt(&mut self) -> Result<()> {
        write!(self.out, "{PROMPT}")?;
        self.out.flush()?;
        Ok(())
    }

    fn show_commands(&mut self) -> Result<()> {
        self.say("\nCOMMANDS")?;
        for (keyword, description) in COMMANDS {
            writeln!(self.out, "{keyword:.<20}{description}")?;
        }
        self.say("")
    }

    fn invalid_command(&mut self) -> Result<()> {
        self.say("\nInvalid command. Type 'help' for the list of available commands")
    }

    fn connect(&mut self) -> Result<()> {
        if let Some(current) = self.state.endpoint() {
            return self.say(&format!(
                "\nYou are already connected to the {} application",
                current.name()
            ));
        }

        self.say("\nWhich application do you want to connect to?")?;
        for (idx, endpoint) in Endpoint::ALL.iter().enumerate() {
            let label = endpoint.name().to_uppercase();
            writeln!(self.out, "{:.<28} {idx}", format!("{label} "))?;
        }
        self.prompt()?;

        let selection = self
            .input
            .next_token()?
            .and_then(|token| token.parse::<i64>().ok())
            .and_then(Endpoint::from_selection);
        let Some(endpoint) = selection else {
            return self.invalid_command();
        };

        self.say("\nStarting connection attempt with the Emo Engine...")?;
        let code = self.gateway.connect(ENGINE_HOST, endpoint.port());
        if code.is_ok() {
            info!(%endpoint, "connected to engine");
            self.state.connect(endpoint);
            self.say(&format!("Connected successfully to {}.", endpoint.name()))
        } else {
            warn!(%endpoint, %code, "engine refused the connection");
            self.say(&format!(
                "Connection failed. Make sure {} is running and try again.",
                endpoint.name()
            ))
        }
    }

    fn disconnect(&mut self) -> Result<()> {
        self.say("\nDisconnecting from the Emo Engine...")?;
        let code = self.gateway.disconnect();
        if code.is_ok() {
            info!("disconnected from engine");
            self.state.disconnect();
            self.say("Disconnected successfully")
        } else {
            warn!(%code, "engine disconnect failed");
            self.say("\nError while disconnecting. Try again.")
        }
    }

    fn read_state(&mut self) -> Result<()> {
        let mut scope = HandleScope::new(&mut self.gateway);

        let polled = scope.next_event();
        echo(&mut self.out, polled)?;
        if polled == ResultCode::ENGINE_DISCONNECTED && self.state.is_connected() {
            warn!("engine link dropped while the session is marked connected");
            writeln!(
                self.out,
                "The engine link was lost. Type 'desconectar' before connecting again."
            )?;
        }

        let extracted = scope.extract_state();
        echo(&mut self.out, extracted)?;

        if let Some(state) = scope.emo_state() {
            debug!(bytes = state.raw.len(), "EmoState extracted");
        }
        Ok(())
    }
}

/// Writes `code` ten times on one line.
fn echo(out: &mut impl Write, code: ResultCode) -> Result<()> {
    let line = vec![code.to_string(); ECHO_REPEAT].join(" ");
    writeln!(out, "{line}")?;
    Ok(())
}
