//! Log capture for hosts and tests.
//!
//! The library only emits records through the `log` facade. A host that wants to show them in
//! its own UI, or a test that wants to assert on them, installs a [`ChannelLogger`] and drains
//! the receiving end of its channel.

use crossbeam::channel::{Receiver, Sender, unbounded};
use log::{Level, Metadata, Record, SetLoggerError};

/// A captured log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub level: Level,
    pub target: String,
    pub message: String,
}

/// A `log::Log` implementation forwarding records over a channel.
pub struct ChannelLogger {
    level: Level,
    sender: Sender<LogMessage>,
}

impl log::Log for ChannelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let _ = self.sender.try_send(LogMessage {
                level: record.metadata().level(),
                target: record.target().to_string(),
                message: format!("{}", record.args()),
            });
        }
    }

    fn flush(&self) {}
}

impl ChannelLogger {
    pub fn new(level: Level, sender: Sender<LogMessage>) -> Self {
        Self { level, sender }
    }

    pub fn with_receiver(level: Level) -> (Self, Receiver<LogMessage>) {
        let (sender, receiver) = unbounded();
        (Self::new(level, sender), receiver)
    }
}

/// Install a [`ChannelLogger`] as the global logger and return the receiving end.
///
/// Fails if a global logger is already installed.
pub fn init_channel(level: Level) -> Result<Receiver<LogMessage>, SetLoggerError> {
    let (logger, receiver) = ChannelLogger::with_receiver(level);
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(level.to_level_filter());
    Ok(receiver)
}

#[cfg(test)]
mod tests {
    use log::Log;

    use super::*;

    #[test]
    fn channel_logger_filters_by_level() {
        // Given
        let (logger, receiver) = ChannelLogger::with_receiver(Level::Warn);

        // When
        logger.log(
            &Record::builder()
                .level(Level::Warn)
                .target("rusty_ecs::test")
                .args(format_args!("kept {}", 1))
                .build(),
        );
        logger.log(
            &Record::builder()
                .level(Level::Debug)
                .args(format_args!("dropped"))
                .build(),
        );

        // Then
        let messages: Vec<_> = receiver.try_iter().collect();
        assert_eq!(
            messages,
            vec![LogMessage {
                level: Level::Warn,
                target: "rusty_ecs::test".to_string(),
                message: "kept 1".to_string(),
            }]
        );
    }
}
