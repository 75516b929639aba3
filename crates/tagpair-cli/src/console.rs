//! Interactive console standing in for the camera, the NFC reader and the
//! display.

use std::str::FromStr;

use anyhow::{Context, bail};
use tagpair_flow::messages::STEPS;
use tagpair_flow::{FlowHandle, FlowState, FlowStatus, RedirectCallback};
use tagpair_hardware::mock::{MockBarcodeReaderHandle, MockNfcReaderHandle};
use tagpair_hardware::{PlatformRedirect, Symbology};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

pub const HELP: &str = "\
commands:
  barcode <code> [symbology]   decode a barcode (default QR_CODE)
  tag <uid>                    present an NFC tag
  fail <reason>                make the active reader fail
  callback <url|query>         deliver the NFC app callback
  start                        start a new flow
  cancel                       cancel the active scan
  status                       show the current status
  help                         show this help
  quit                         exit";

/// A line typed at the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Barcode { code: String, symbology: Symbology },
    Tag(String),
    Fail(String),
    Callback(String),
    Start,
    Cancel,
    Status,
    Help,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> anyhow::Result<Self> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(w, r)| (w, r.trim()));

        let command = match word.to_ascii_lowercase().as_str() {
            "barcode" | "b" => {
                let mut parts = rest.split_whitespace();
                let Some(code) = parts.next() else {
                    bail!("usage: barcode <code> [symbology]");
                };
                let symbology = match parts.next() {
                    Some(name) => name.parse::<Symbology>()?,
                    None => Symbology::QrCode,
                };
                Self::Barcode {
                    code: code.to_string(),
                    symbology,
                }
            }
            "tag" | "t" => {
                if rest.is_empty() {
                    bail!("usage: tag <uid>");
                }
                Self::Tag(rest.to_string())
            }
            "fail" => Self::Fail(rest.to_string()),
            "callback" => {
                if rest.is_empty() {
                    bail!("usage: callback <url|query>");
                }
                Self::Callback(rest.to_string())
            }
            "start" => Self::Start,
            "cancel" => Self::Cancel,
            "status" | "s" => Self::Status,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => bail!("unknown command '{other}', type 'help'"),
        };
        Ok(command)
    }
}

/// Render a status snapshot as a single console line.
pub fn render_status(status: &FlowStatus) -> String {
    let title = match status.state {
        FlowState::Idle => "Idle",
        _ => status.step_title,
    };
    let mut line = format!(
        "[{}/{} {}] {} session={}",
        status.step + 1,
        STEPS.len(),
        title,
        status.state,
        status.session_id
    );
    if let Some(barcode) = &status.barcode {
        line.push_str(&format!(" barcode={barcode}"));
    }
    if let Some(tag) = &status.tag {
        line.push_str(&format!(" tag={tag}"));
    }
    if let Some(message) = &status.message {
        line.push_str(&format!(" | {message}"));
    }
    line
}

/// Redirect that prints the deep link instead of leaving the process.
#[derive(Debug, Default)]
pub struct ConsoleRedirect;

impl PlatformRedirect for ConsoleRedirect {
    fn redirect(&mut self, url: &str) -> tagpair_hardware::Result<()> {
        info!("Handing NFC read to external app: {}", url);
        println!("open in NFC scan app: {url}");
        println!("then run: callback session_id=<id>&tag_data=<uid>");
        Ok(())
    }
}

/// Reads commands from stdin and prints status changes until `quit`, EOF or
/// Ctrl-C.
pub struct Console {
    flow: FlowHandle,
    barcode: MockBarcodeReaderHandle,
    nfc: MockNfcReaderHandle,
}

impl Console {
    pub fn new(flow: FlowHandle, barcode: MockBarcodeReaderHandle, nfc: MockNfcReaderHandle) -> Self {
        Self { flow, barcode, nfc }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut status = self.flow.subscribe();

        println!("{HELP}");
        println!("{}", render_status(&status.borrow_and_update()));

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line.context("failed to read stdin")? else {
                        debug!("stdin closed");
                        break;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match line.parse::<ConsoleCommand>() {
                        Ok(ConsoleCommand::Quit) => break,
                        Ok(command) => {
                            if let Err(e) = self.execute(command).await {
                                println!("error: {e:#}");
                            }
                        }
                        Err(e) => println!("{e}"),
                    }
                }
                changed = status.changed() => {
                    if changed.is_err() {
                        warn!("Flow runner stopped");
                        break;
                    }
                    println!("{}", render_status(&status.borrow_and_update()));
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted");
                    break;
                }
            }
        }

        self.flow.shutdown().await?;
        Ok(())
    }

    async fn execute(&self, command: ConsoleCommand) -> anyhow::Result<()> {
        match command {
            ConsoleCommand::Barcode { code, symbology } => {
                self.barcode.scan(&code, symbology).await?;
            }
            ConsoleCommand::Tag(uid) => self.nfc.present_tag(&uid).await?,
            ConsoleCommand::Fail(reason) => match self.flow.status().state {
                FlowState::ScanningBarcode => self.barcode.fail(reason).await?,
                FlowState::ScanningNfc => self.nfc.fail(reason).await?,
                state => bail!("no reader is active in state {state}"),
            },
            ConsoleCommand::Callback(input) => {
                let callback = RedirectCallback::from_url(&input)?
                    .context("callback needs both session_id and tag_data")?;
                self.flow.redirect_callback(callback).await?;
            }
            ConsoleCommand::Start => self.flow.start().await?,
            ConsoleCommand::Cancel => self.flow.cancel().await?,
            ConsoleCommand::Status => println!("{}", render_status(&self.flow.status())),
            ConsoleCommand::Help => println!("{HELP}"),
            ConsoleCommand::Quit => {}
        }
        Ok(())
    }
}
