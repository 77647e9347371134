//! UCI engine subprocess client.
//!
//! A worker thread owns the engine process and serves one search at a time;
//! a reader thread pumps the engine's stdout into a channel so every wait can
//! carry a deadline. The process is launched lazily on the first request, so
//! a missing engine binary only surfaces when an engine move is actually
//! needed.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context};
use futures::channel::oneshot;
use log::{debug, info, warn};

use super::{MoveProvider, Score, SearchReply, SearchRequest};
use crate::Result;

const HANDSHAKE_LIMIT: Duration = Duration::from_secs(10);
const SEARCH_DEADLINE: Duration = Duration::from_secs(60);
const STOP_GRACE: Duration = Duration::from_secs(2);

/// Handle to a UCI engine running as a background subprocess.
///
/// Dropping the handle disconnects the request channel; the worker then sends
/// `quit` and reaps the process.
pub struct UciEngine {
    requests: mpsc::Sender<Job>,
}

struct Job {
    request: SearchRequest,
    reply: oneshot::Sender<Result<SearchReply>>,
}

impl UciEngine {
    pub fn new(command: String, depth: u32) -> Self {
        let (requests, jobs) = mpsc::channel::<Job>();
        thread::spawn(move || worker_loop(command, depth, jobs));
        UciEngine { requests }
    }
}

impl MoveProvider for UciEngine {
    fn request_move(&self, request: SearchRequest) -> oneshot::Receiver<Result<SearchReply>> {
        let (tx, rx) = oneshot::channel();
        if let Err(send_error) = self.requests.send(Job {
            request,
            reply: tx,
        }) {
            let Job { reply, .. } = send_error.0;
            let _ = reply.send(Err(anyhow!("the engine worker is no longer running")));
        }
        rx
    }
}

fn worker_loop(command: String, depth: u32, jobs: Receiver<Job>) {
    let mut engine: Option<EngineProcess> = None;

    for Job { request, reply } in jobs {
        let result = match ensure_engine(&mut engine, &command) {
            Ok(process) => run_search(process, &request, depth),
            Err(error) => Err(error),
        };
        if result.is_err() {
            // The protocol state is unknown after a failure; respawn next time.
            if let Some(mut broken) = engine.take() {
                let _ = broken.child.kill();
                let _ = broken.child.wait();
            }
        }
        let _ = reply.send(result);
    }

    if let Some(mut process) = engine {
        let _ = process.send("quit");
        let _ = process.child.wait();
    }
}

fn ensure_engine<'a>(
    slot: &'a mut Option<EngineProcess>,
    command: &str,
) -> Result<&'a mut EngineProcess> {
    if slot.is_none() {
        *slot = Some(EngineProcess::launch(command)?);
    }
    Ok(slot.as_mut().expect("engine was just launched"))
}

struct EngineProcess {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<String>,
}

impl EngineProcess {
    fn launch(command: &str) -> Result<EngineProcess> {
        info!("starting engine process `{command}`");
        let mut child = Command::new(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to start engine `{command}`"))?;
        let stdin = child.stdin.take().context("engine stdin unavailable")?;
        let stdout = child.stdout.take().context("engine stdout unavailable")?;

        let (line_tx, lines) = mpsc::channel();
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                match line {
                    Ok(line) => {
                        if line_tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });

        let mut process = EngineProcess {
            child,
            stdin,
            lines,
        };
        process.handshake()?;
        Ok(process)
    }

    fn handshake(&mut self) -> Result<()> {
        self.send("uci")?;
        self.wait_for(|line| line == "uciok", HANDSHAKE_LIMIT)
            .context("engine did not complete the uci handshake")?;
        self.send("isready")?;
        self.wait_for(|line| line == "readyok", HANDSHAKE_LIMIT)
            .context("engine did not report readiness")?;
        Ok(())
    }

    fn send(&mut self, line: &str) -> Result<()> {
        debug!("uci> {line}");
        writeln!(self.stdin, "{line}").context("engine stdin closed")?;
        self.stdin.flush().context("engine stdin closed")?;
        Ok(())
    }

    fn wait_for(
        &mut self,
        matches: impl Fn(&str) -> bool,
        limit: Duration,
    ) -> Result<String> {
        let deadline = Instant::now() + limit;
        loop {
            let now = Instant::now();
            if now >= deadline {
                bail!("timed out waiting for the engine");
            }
            match self.lines.recv_timeout(deadline - now) {
                Ok(line) => {
                    debug!("uci< {line}");
                    if matches(&line) {
                        return Ok(line);
                    }
                }
                Err(RecvTimeoutError::Timeout) => bail!("timed out waiting for the engine"),
                Err(RecvTimeoutError::Disconnected) => bail!("engine process exited"),
            }
        }
    }
}

fn run_search(
    engine: &mut EngineProcess,
    request: &SearchRequest,
    depth: u32,
) -> Result<SearchReply> {
    engine.send(&format!("position fen {}", request.fen))?;
    engine.send(&format!("go depth {depth}"))?;

    let mut evaluation: Option<Score> = None;
    let deadline = Instant::now() + SEARCH_DEADLINE;
    loop {
        let now = Instant::now();
        let line = if now >= deadline {
            None
        } else {
            match engine.lines.recv_timeout(deadline - now) {
                Ok(line) => Some(line),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => bail!("engine process exited mid-search"),
            }
        };

        let Some(line) = line else {
            warn!("engine exceeded the search deadline, stopping it");
            engine.send("stop")?;
            let line = engine
                .wait_for(|line| line.starts_with("bestmove"), STOP_GRACE)
                .context("engine did not answer the search")?;
            return reply_from_bestmove(&line, evaluation);
        };

        debug!("uci< {line}");
        if let Some(score) = parse_info_score(&line) {
            evaluation = Some(score);
        }
        if line.starts_with("bestmove") {
            return reply_from_bestmove(&line, evaluation);
        }
    }
}

fn reply_from_bestmove(line: &str, evaluation: Option<Score>) -> Result<SearchReply> {
    let best_move = parse_bestmove(line)
        .with_context(|| format!("malformed bestmove line \"{line}\""))?;
    if best_move == "(none)" {
        bail!("engine found no move to play");
    }
    Ok(SearchReply {
        best_move: best_move.to_string(),
        evaluation: evaluation
            .map(|score| score.to_string())
            .unwrap_or_else(|| "Calculating...".to_string()),
    })
}

fn parse_info_score(line: &str) -> Option<Score> {
    if !line.starts_with("info") {
        return None;
    }
    let mut parts = line.split_whitespace();
    while let Some(token) = parts.next() {
        if token != "score" {
            continue;
        }
        let kind = parts.next()?;
        let value: i32 = parts.next()?.parse().ok()?;
        return match kind {
            "cp" => Some(Score::Centipawns(value)),
            "mate" => Some(Score::MateIn(value)),
            _ => None,
        };
    }
    None
}

fn parse_bestmove(line: &str) -> Option<&str> {
    let mut parts = line.split_whitespace();
    if parts.next()? != "bestmove" {
        return None;
    }
    parts.next()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_centipawn_info_lines() {
        let line = "info depth 12 seldepth 16 multipv 1 score cp 35 nodes 90010 pv e2e4";
        assert_eq!(parse_info_score(line), Some(Score::Centipawns(35)));

        let line = "info depth 8 score cp -210 nodes 1200";
        assert_eq!(parse_info_score(line), Some(Score::Centipawns(-210)));
    }

    #[test]
    fn parses_mate_info_lines() {
        let line = "info depth 20 score mate -3 nodes 500";
        assert_eq!(parse_info_score(line), Some(Score::MateIn(-3)));
    }

    #[test]
    fn ignores_lines_without_a_score() {
        assert_eq!(parse_info_score("info string NNUE evaluation enabled"), None);
        assert_eq!(parse_info_score("readyok"), None);
        assert_eq!(parse_info_score("info depth 3 score lowerbound"), None);
    }

    #[test]
    fn parses_bestmove_lines() {
        assert_eq!(parse_bestmove("bestmove e2e4 ponder e7e5"), Some("e2e4"));
        assert_eq!(parse_bestmove("bestmove a7a8q"), Some("a7a8q"));
        assert_eq!(parse_bestmove("bestmove (none)"), Some("(none)"));
        assert_eq!(parse_bestmove("info depth 1"), None);
        assert_eq!(parse_bestmove("bestmove"), None);
    }

    #[test]
    fn bestmove_none_is_an_error() {
        assert!(reply_from_bestmove("bestmove (none)", None).is_err());
        let reply = reply_from_bestmove("bestmove e7e5", Some(Score::Centipawns(-30))).unwrap();
        assert_eq!(reply.best_move, "e7e5");
        assert_eq!(reply.evaluation, "Score: -0.3");
        let reply = reply_from_bestmove("bestmove e7e5", None).unwrap();
        assert_eq!(reply.evaluation, "Calculating...");
    }
}
