//! Scripted fake OLT console for integration tests.
//!
//! The fake runs on its own thread behind a [`ChannelPeer`]: it performs the
//! login dialogue, answers bare EOLs with the prompt (resync), replays the
//! scripted steps for known commands and stops on `exit`.

#![allow(dead_code)]

use olt_cli_protocol::DeviceModel;
use olt_session::{Capture, ChannelPeer, ChannelTransport, Session, SessionConfig};
use std::collections::HashMap;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How long the fake waits for the session before giving up.
pub const DEVICE_IDLE: Duration = Duration::from_secs(10);

/// One action of a scripted answer.
#[derive(Debug, Clone)]
pub enum Step {
    /// Write bytes to the session.
    Send(Vec<u8>),
    /// Block until the session writes these bytes.
    AwaitReply(Vec<u8>),
    Pause(Duration),
    /// Never answer.
    Hang,
}

impl Step {
    pub fn send(text: impl AsRef<[u8]>) -> Step {
        Step::Send(text.as_ref().to_vec())
    }
}

/// What the fake saw during its run.
#[derive(Debug, Default)]
pub struct Transcript {
    pub username: String,
    pub password: String,
    /// Non-empty lines after login, in order.
    pub commands: Vec<String>,
    /// Bare EOLs received (resyncs).
    pub resyncs: usize,
    /// Telnet commands received, as `[IAC, verb, option]`.
    pub telnet: Vec<[u8; 3]>,
}

/// Builder for a scripted console.
pub struct FakeOlt {
    prompt: String,
    username_prompt: String,
    preamble: Vec<u8>,
    scripts: HashMap<String, Vec<Step>>,
}

impl FakeOlt {
    pub fn new(model: DeviceModel) -> Self {
        FakeOlt {
            prompt: model.default_prompt().to_string(),
            username_prompt: model.username_prompt().to_string(),
            preamble: b"\r\nZyXEL console\r\n".to_vec(),
            scripts: HashMap::new(),
        }
    }

    /// Bytes sent before the username prompt.
    pub fn preamble(mut self, bytes: impl AsRef<[u8]>) -> Self {
        self.preamble = bytes.as_ref().to_vec();
        self
    }

    /// Answer `command` with its echo, `body` and the prompt.
    pub fn respond(self, command: &str, body: &str) -> Self {
        let answer = format!("{}\r\n{}\r\n{} ", command, body.replace('\n', "\r\n"), self.prompt);
        self.script(command, vec![Step::send(answer)])
    }

    pub fn script(mut self, command: &str, steps: Vec<Step>) -> Self {
        self.scripts.insert(command.to_string(), steps);
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Run the console on its own thread.
    pub fn spawn(self, peer: ChannelPeer) -> JoinHandle<Transcript> {
        thread::spawn(move || self.run(peer))
    }

    fn run(self, peer: ChannelPeer) -> Transcript {
        let mut transcript = Transcript::default();
        let mut input = LineInput::new(peer.clone());
        let prompt_line = format!("\r\n{} ", self.prompt);

        let mut login = self.preamble.clone();
        login.extend_from_slice(self.username_prompt.as_bytes());
        peer.send(login);
        let Some(username) = input.next_line() else {
            return transcript;
        };
        transcript.username = username;
        peer.send(b"Password:");
        let Some(password) = input.next_line() else {
            return transcript;
        };
        transcript.password = password;
        peer.send(format!("\r\nWelcome{}", prompt_line));

        while let Some(line) = input.next_line() {
            if line.is_empty() {
                transcript.resyncs += 1;
                peer.send(&prompt_line);
                continue;
            }
            transcript.commands.push(line.clone());
            if line == "exit" {
                break;
            }
            let steps = self.scripts.get(&line).cloned().unwrap_or_else(|| {
                vec![Step::send(format!(
                    "{}\r\n% Unknown command.{}",
                    line, prompt_line
                ))]
            });
            for step in steps {
                match step {
                    Step::Send(bytes) => {
                        peer.send(bytes);
                    }
                    Step::AwaitReply(bytes) => {
                        if !input.wait_for(&bytes) {
                            break;
                        }
                    }
                    Step::Pause(duration) => thread::sleep(duration),
                    Step::Hang => break,
                }
            }
        }

        transcript.telnet = input.telnet;
        transcript
    }
}

/// Splits what the session writes into lines, pulling telnet commands out.
struct LineInput {
    peer: ChannelPeer,
    pending: Vec<u8>,
    telnet: Vec<[u8; 3]>,
    partial_iac: Vec<u8>,
}

impl LineInput {
    fn new(peer: ChannelPeer) -> Self {
        LineInput {
            peer,
            pending: Vec::new(),
            telnet: Vec::new(),
            partial_iac: Vec::new(),
        }
    }

    fn receive(&mut self) -> bool {
        let Some(chunk) = self.peer.recv_timeout(DEVICE_IDLE) else {
            return false;
        };
        for byte in chunk {
            if !self.partial_iac.is_empty() || byte == 0xff {
                self.partial_iac.push(byte);
                if self.partial_iac.len() == 3 {
                    let command = [self.partial_iac[0], self.partial_iac[1], self.partial_iac[2]];
                    self.telnet.push(command);
                    self.partial_iac.clear();
                }
                continue;
            }
            self.pending.push(byte);
        }
        true
    }

    fn next_line(&mut self) -> Option<String> {
        loop {
            if let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = self.pending.drain(..=pos).collect();
                let text = String::from_utf8_lossy(&line);
                return Some(text.trim_end_matches(['\r', '\n']).to_string());
            }
            if !self.receive() {
                return None;
            }
        }
    }

    fn wait_for(&mut self, needle: &[u8]) -> bool {
        loop {
            if let Some(pos) = self
                .pending
                .windows(needle.len())
                .position(|window| window == needle)
            {
                self.pending.drain(pos..pos + needle.len());
                return true;
            }
            if !self.receive() {
                return false;
            }
        }
    }
}

/// Session config for talking to a [`FakeOlt`]: short timeouts and drain.
pub fn test_config(model: DeviceModel) -> SessionConfig {
    let mut config = SessionConfig::for_model(model)
        .with_target("fake-olt", 23)
        .with_credentials("admin", "1234");
    config.timeout_secs = 2;
    config.long_timeout_secs = 3;
    config.drain_millis = 20;
    config
}

/// Start `fake` and open a logged-in session to it.
pub fn open_session(
    fake: FakeOlt,
    config: SessionConfig,
    capture: Capture,
) -> (Session<ChannelTransport>, JoinHandle<Transcript>) {
    let (transport, peer) = ChannelTransport::pair();
    let device = fake.spawn(peer);
    let session = Session::open(transport, config, capture).expect("login should succeed");
    (session, device)
}
