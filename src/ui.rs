//! Saída de terminal do contrata.
//!
//! Resultados vão para stdout como JSON; erros vão para stderr com cor via
//! `console`, já classificados como falha de negócio ou de sistema.

use console::Style;
use serde::Serialize;

use crate::error::{ContrataError, FailureKind};

pub struct Output {
    green: Style,
    red: Style,
    yellow: Style,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    pub fn new() -> Self {
        Self {
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow().bold(),
        }
    }

    /// Imprime `value` em JSON formatado, precedido de uma linha de título em stderr.
    /// Nada é impresso se a serialização falhar.
    pub fn success<T: Serialize>(&self, title: &str, value: &T) -> Result<(), serde_json::Error> {
        let rendered = render_json(value)?;
        eprintln!("{} {title}", self.green.apply_to("✓"));
        println!("{rendered}");
        Ok(())
    }

    /// Falhas de negócio em amarelo, falhas de sistema em vermelho.
    pub fn failure(&self, err: &ContrataError) {
        let kind = err.failure_kind();
        let style = match kind {
            FailureKind::Business => &self.yellow,
            FailureKind::System => &self.red,
        };
        eprintln!("{} {kind} failure: {err}", style.apply_to("✗"));
    }

    /// Falha fora dos casos de uso (configuração, abertura de recursos).
    pub fn fatal(&self, err: &anyhow::Error) {
        eprintln!("{} {err:#}", self.red.apply_to("✗"));
    }
}

pub fn render_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

/// Código de saída do processo para um erro de caso de uso.
pub fn exit_code(err: &ContrataError) -> u8 {
    match err.failure_kind() {
        FailureKind::Business => 1,
        FailureKind::System => 2,
    }
}
