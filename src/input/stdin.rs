//! Taps from a line-oriented reader (normally standard input).
//!
//! | Line             | Event             |
//! |------------------|-------------------|
//! | empty / anything | [`TapEvent::Tap`]  |
//! | `q`, `quit`      | [`TapEvent::Quit`] |
//! | end of input     | [`TapEvent::Quit`] |

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

use super::TapEvent;

/// Forward one event per line of `reader` until it ends, a quit line is
/// read, or the receiver goes away.
pub async fn forward_stdin_taps<R>(reader: R, tx: mpsc::Sender<TapEvent>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();

    loop {
        let event = match lines.next_line().await {
            Ok(Some(line)) => match line.trim() {
                "q" | "quit" => TapEvent::Quit,
                _ => TapEvent::Tap,
            },
            Ok(None) => TapEvent::Quit,
            Err(e) => {
                log::warn!("input: cannot read stdin: {e}");
                TapEvent::Quit
            }
        };

        if tx.send(event).await.is_err() || event == TapEvent::Quit {
            break;
        }
    }
}
