//! Interactive command interpreter.
//!
//! One line of operator input at a time: tokenize (a bracketed address list
//! such as `[addr1 addr2]` stays a single token), dispatch on the first
//! token, report the result. Every error here is recoverable: it aborts
//! the offending command and the loop continues.

use std::sync::Arc;

use crate::error::CommandError;
use crate::node::{Node, parse_peer_id};
use crate::proto::{PING_ALPN, msg, ping};

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Whoami,
    Addme,
    Add { id: String, addrs: String },
    Ls,
    Ping { id: String },
    Send { id: String, body: String },
    Quit,
}

/// Split an input line into tokens. Whitespace-separated, except that
/// everything from the first `[` onward is one token, so an address list
/// survives as a unit.
pub fn tokenize(line: &str) -> Vec<String> {
    let line = line.trim();
    match line.find('[') {
        Some(i) => {
            let mut toks: Vec<String> = line[..i].split_whitespace().map(String::from).collect();
            toks.push(line[i..].trim().to_string());
            toks
        }
        None => line.split_whitespace().map(String::from).collect(),
    }
}

/// Parse one input line. `Ok(None)` for a blank line.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let toks = tokenize(line);
    let Some(head) = toks.first() else {
        return Ok(None);
    };
    let cmd = match head.as_str() {
        "help" => Command::Help,
        "whoami" => Command::Whoami,
        "addme" => Command::Addme,
        "ls" => Command::Ls,
        "quit" => Command::Quit,
        "add" => {
            if toks.len() != 3 {
                return Err(CommandError::Usage("add <peer ID> <addr or [addr list]>"));
            }
            Command::Add {
                id: toks[1].clone(),
                addrs: toks[2].clone(),
            }
        }
        "ping" => {
            if toks.len() != 2 {
                return Err(CommandError::Usage("ping <peer ID>"));
            }
            Command::Ping {
                id: toks[1].clone(),
            }
        }
        "send" => {
            if toks.len() < 3 {
                return Err(CommandError::Usage("send <peer ID> <message...>"));
            }
            // tokens after the target are rejoined with single spaces
            Command::Send {
                id: toks[1].clone(),
                body: toks[2..].join(" "),
            }
        }
        other => return Err(CommandError::UnknownCommand(other.to_string())),
    };
    Ok(Some(cmd))
}

/// Executes parsed commands against the node. Holds no state of its own;
/// the node's peer table is the process-wide source of truth.
pub struct Interpreter {
    node: Arc<Node>,
}

impl Interpreter {
    pub fn new(node: Arc<Node>) -> Self {
        Self { node }
    }

    /// Execute one command. Returns `false` when the loop should stop.
    pub async fn dispatch(&self, cmd: Command) -> bool {
        match cmd {
            Command::Help => print_help(),
            Command::Whoami => self.whoami(),
            Command::Addme => self.addme(),
            Command::Ls => self.ls().await,
            Command::Add { id, addrs } => {
                if let Err(e) = self.add(&id, &addrs).await {
                    println!("{e}");
                }
            }
            Command::Ping { id } => {
                if let Err(e) = self.ping(&id).await {
                    println!("{e}");
                }
            }
            Command::Send { id, body } => {
                if let Err(e) = self.send(&id, &body).await {
                    println!("{e}");
                }
            }
            Command::Quit => return false,
        }
        true
    }

    pub fn whoami(&self) {
        println!("I'm the peer: {}", self.node.id());
        for addr in self.find_me_addrs() {
            println!("  reachable at: {addr}");
        }
    }

    /// Print the paste-ready line another instance uses to find this peer.
    pub fn addme(&self) {
        let addrs = self.find_me_addrs();
        println!("add {} [{}]", self.node.id(), addrs.join(" "));
    }

    /// Relay first (the circuit form), then the bound sockets.
    fn find_me_addrs(&self) -> Vec<String> {
        let mut addrs = Vec::new();
        if let Some(url) = self.node.relay_url() {
            addrs.push(url.to_string());
        }
        for sock in self.node.bound_sockets() {
            addrs.push(sock.to_string());
        }
        addrs
    }

    async fn ls(&self) {
        let peers = self.node.book().list().await;
        if peers.is_empty() {
            println!("No known peers");
            return;
        }
        for id in peers {
            println!("{id}");
        }
    }

    /// Validate and store the addresses, then dial the peer to confirm it
    /// is reachable. The record is kept even when the dial fails; a later
    /// `ping` retries with the same addresses.
    pub async fn add(&self, id: &str, addrs: &str) -> Result<(), CommandError> {
        let id = parse_peer_id(id)?;
        let count = self.node.book().add(id, addrs).await?;
        println!("Peer added: {id} ({count} addrs)");
        let conn = self.node.connect(id, PING_ALPN).await?;
        conn.close(0u32.into(), b"done");
        Ok(())
    }

    async fn ping(&self, id: &str) -> Result<(), CommandError> {
        let id = parse_peer_id(id)?;
        ping::ping(&self.node, id).await?;
        println!("Pong! round trip to {id} complete");
        Ok(())
    }

    async fn send(&self, id: &str, body: &str) -> Result<(), CommandError> {
        let id = parse_peer_id(id)?;
        msg::send(&self.node, id, body).await?;
        println!("Message delivered to {id}");
        Ok(())
    }
}

pub fn print_help() {
    println!("APP FLAGS (passed when starting the app):");
    println!();
    println!("--listen          Socket addresses to listen on, separated by space.");
    println!("                  Useful if behind proxy, DNS, port forwarding, ...");
    println!("--relay           Host a relay hop other peers can connect through.");
    println!("--relay-url       Relay to register with (default: public relays).");
    println!("--no-interactive  Run without user intervention, for ping and relay purposes.");
    println!();
    println!("APP USAGE (once the app is running):");
    println!();
    println!("help                      Prints this message.");
    println!("whoami                    Prints info about this peer (ID, addrs).");
    println!("addme                     Prints the command others use to find you.");
    println!("add <peer ID> <addrs>     Adds a peer with the given ID and addr list,");
    println!("                          then connects to it.");
    println!("ls                        Prints the list of known peers.");
    println!("ping <peer ID>            Sends a ping to the peer.");
    println!("send <peer ID> <message>  Sends a text message to the peer.");
    println!("quit                      Stop the app.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_plain() {
        assert_eq!(tokenize("ping abc123\n"), vec!["ping", "abc123"]);
        assert_eq!(tokenize("  ls  "), vec!["ls"]);
        assert!(tokenize("\n").is_empty());
    }

    #[test]
    fn tokenize_keeps_bracketed_list_whole() {
        assert_eq!(
            tokenize("add abc [http://r.example 10.0.0.1:4433]\n"),
            vec!["add", "abc", "[http://r.example 10.0.0.1:4433]"]
        );
    }

    #[test]
    fn parse_blank_line_is_noop() {
        assert_eq!(parse("").unwrap(), None);
        assert_eq!(parse("   \n").unwrap(), None);
    }

    #[test]
    fn parse_simple_commands() {
        assert_eq!(parse("help\n").unwrap(), Some(Command::Help));
        assert_eq!(parse("whoami").unwrap(), Some(Command::Whoami));
        assert_eq!(parse("addme").unwrap(), Some(Command::Addme));
        assert_eq!(parse("ls").unwrap(), Some(Command::Ls));
        assert_eq!(parse("quit").unwrap(), Some(Command::Quit));
    }

    #[test]
    fn parse_add_with_list() {
        let cmd = parse("add abc [x y]").unwrap().unwrap();
        assert_eq!(
            cmd,
            Command::Add {
                id: "abc".into(),
                addrs: "[x y]".into()
            }
        );
    }

    #[test]
    fn parse_send_rejoins_body_with_single_spaces() {
        let cmd = parse("send abc hello   world again").unwrap().unwrap();
        assert_eq!(
            cmd,
            Command::Send {
                id: "abc".into(),
                body: "hello world again".into()
            }
        );
    }

    #[test]
    fn parse_wrong_arity() {
        assert!(matches!(parse("ping"), Err(CommandError::Usage(_))));
        assert!(matches!(parse("ping a b"), Err(CommandError::Usage(_))));
        assert!(matches!(parse("add onlyid"), Err(CommandError::Usage(_))));
        assert!(matches!(parse("send abc"), Err(CommandError::Usage(_))));
    }

    #[test]
    fn parse_unknown_command() {
        assert!(matches!(
            parse("frobnicate"),
            Err(CommandError::UnknownCommand(_))
        ));
    }
}
