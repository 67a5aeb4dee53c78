use cineintel_core::domain::movie::{
    MovieQuery, MovieQueryPatch, OutcomeFilter, PageResult, SortField, SortOrder,
};
use cineintel_core::query::{MovieQueryCoordinator, QuerySnapshot, QueryState};
use serde::Serialize;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

#[derive(Debug, Clone, PartialEq)]
pub enum ExploreCommand {
    Edit(MovieQueryPatch),
    Retry,
    Quit,
}

/// Parses one input line. Blank lines and `#` comments yield `None`.
pub fn parse_command(line: &str) -> anyhow::Result<Option<ExploreCommand>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let cmd = match verb.to_ascii_lowercase().as_str() {
        "search" => ExploreCommand::Edit(MovieQueryPatch::search(rest)),
        "genre" => ExploreCommand::Edit(MovieQueryPatch::genre(rest)),
        "outcome" => {
            ExploreCommand::Edit(MovieQueryPatch::outcome(rest.parse::<OutcomeFilter>()?))
        }
        "page" => ExploreCommand::Edit(MovieQueryPatch::page(parse_number("page", rest)?)),
        "page-size" => ExploreCommand::Edit(MovieQueryPatch {
            page_size: Some(parse_number("page-size", rest)?),
            ..Default::default()
        }),
        "sort" => {
            let mut parts = rest.split_whitespace();
            let field = parts
                .next()
                .ok_or_else(|| anyhow::anyhow!("sort needs a field"))?
                .parse::<SortField>()?;
            let order = match parts.next() {
                Some(order) => order.parse::<SortOrder>()?,
                None => SortOrder::default(),
            };
            ExploreCommand::Edit(MovieQueryPatch::sort(field, order))
        }
        "retry" => ExploreCommand::Retry,
        "quit" | "exit" => ExploreCommand::Quit,
        other => anyhow::bail!("unknown command {other:?}"),
    };
    Ok(Some(cmd))
}

fn parse_number(what: &str, s: &str) -> anyhow::Result<u32> {
    s.parse::<u32>()
        .map_err(|e| anyhow::anyhow!("{what} expects a number (got {s:?}): {e}"))
}

#[derive(Debug, Serialize)]
struct SnapshotLine<'a> {
    state: QueryState,
    issued_seq: u64,
    query: &'a MovieQuery,
    result: Option<&'a PageResult>,
    error: Option<String>,
}

fn write_snapshot<W: Write>(out: &mut W, snapshot: &QuerySnapshot) -> anyhow::Result<()> {
    let line = SnapshotLine {
        state: snapshot.state,
        issued_seq: snapshot.issued_seq,
        query: &snapshot.query,
        result: snapshot.result.as_deref(),
        error: snapshot.error.as_ref().map(|e| e.to_string()),
    };
    serde_json::to_writer(&mut *out, &line)?;
    writeln!(out)?;
    Ok(())
}

fn write_error<W: Write>(out: &mut W, err: &dyn std::fmt::Display) -> anyhow::Result<()> {
    writeln!(out, "{}", serde_json::json!({ "error": err.to_string() }))?;
    Ok(())
}

/// Feeds `input` lines to the coordinator and writes every published snapshot as a JSON line.
///
/// End of input waits for the last edit to settle; `quit` stops immediately.
pub async fn run_explore<R, W>(
    coordinator: MovieQueryCoordinator,
    input: R,
    out: &mut W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut updates = coordinator.subscribe();
    updates.borrow_and_update();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    let last = coordinator.wait_settled().await?;
                    write_snapshot(out, &last)?;
                    break;
                };
                match parse_command(&line) {
                    Ok(None) => {}
                    Ok(Some(ExploreCommand::Quit)) => break,
                    Ok(Some(ExploreCommand::Retry)) => coordinator.retry()?,
                    Ok(Some(ExploreCommand::Edit(patch))) => {
                        if let Err(err) = coordinator.set_query(patch) {
                            write_error(out, &err)?;
                        }
                    }
                    Err(err) => write_error(out, &err)?,
                }
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                write_snapshot(out, &snapshot)?;
            }
        }
    }

    coordinator.shutdown().await;
    Ok(())
}
