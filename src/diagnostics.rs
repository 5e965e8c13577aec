use crate::db::BotStore;

/// Lines collected over one webhook invocation, persisted as a single row
/// once the invocation ends. Every line is also emitted through `tracing`.
#[derive(Debug, Default)]
pub struct InvocationLog {
    lines: Vec<String>,
    has_errors: bool,
}

impl InvocationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::info!("{}", line);
        self.lines.push(line);
    }

    /// Also routes the whole invocation to the error log on flush.
    pub fn error(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::error!("{}", line);
        self.lines.push(format!("ERROR {line}"));
        self.has_errors = true;
    }

    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn body(&self) -> String {
        self.lines.join("\n")
    }

    /// Failures here are only traced: diagnostics never fail an invocation.
    pub async fn flush(self, store: &dyn BotStore) {
        let body = self.body();
        if let Err(e) = store.append_log(&body).await {
            tracing::error!("Failed to persist invocation log: {}", e);
        }
        if self.has_errors {
            if let Err(e) = store.append_error_log(&body).await {
                tracing::error!("Failed to persist error log: {}", e);
            }
        }
    }
}
