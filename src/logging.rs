use tracing_subscriber::fmt::MakeWriter;

/// Tees formatted log lines into a broadcast channel so `/api/logs` can stream them.
#[derive(Clone)]
pub(crate) struct SseMakeWriter {
    pub sender: tokio::sync::broadcast::Sender<String>,
    pub suppress_stdout: bool,
}

impl<'a> MakeWriter<'a> for SseMakeWriter {
    type Writer = SseWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SseWriter {
            sender: self.sender.clone(),
            suppress_stdout: self.suppress_stdout,
        }
    }
}

pub(crate) struct SseWriter {
    sender: tokio::sync::broadcast::Sender<String>,
    suppress_stdout: bool,
}

impl std::io::Write for SseWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let msg = String::from_utf8_lossy(buf).to_string();
        let _ = self.sender.send(msg); // no subscribers is fine
        if !self.suppress_stdout {
            std::io::stdout().write_all(buf)?;
        }
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        if !self.suppress_stdout {
            std::io::stdout().flush()?;
        }
        Ok(())
    }
}

/// Installs the global subscriber at a fixed level. A second call is a no-op.
pub(crate) fn init(
    log_tx: tokio::sync::broadcast::Sender<String>,
    level: tracing::Level,
    suppress_stdout: bool,
) {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .with_ansi(false)
        .with_writer(SseMakeWriter {
            sender: log_tx,
            suppress_stdout,
        })
        .finish();
    // A second install (tests, repeated CLI calls) keeps the first subscriber.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn writer_forwards_lines_to_subscribers() {
        let (tx, mut rx) = tokio::sync::broadcast::channel(4);
        let make = SseMakeWriter {
            sender: tx,
            suppress_stdout: true,
        };
        let mut writer = make.make_writer();
        assert_eq!(writer.write(b"job done\n").unwrap(), 9);
        assert_eq!(rx.try_recv().unwrap(), "job done\n");
    }

    #[test]
    fn writer_without_subscribers_still_succeeds() {
        let (tx, rx) = tokio::sync::broadcast::channel::<String>(4);
        drop(rx);
        let make = SseMakeWriter {
            sender: tx,
            suppress_stdout: true,
        };
        assert!(make.make_writer().write(b"x").is_ok());
    }
}
