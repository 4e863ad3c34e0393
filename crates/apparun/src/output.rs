//! Rendering results to stdout or a file

use std::io::Write;

use color_eyre::eyre::{WrapErr, eyre};
use serde::Serialize;

use crate::cli::{OutputArgs, OutputFormat};
use crate::util::atomic_write;

/// Serialize `value` in the requested format, newline terminated
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> color_eyre::Result<String> {
    let mut text = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_saphyr::to_string(value).map_err(|e| eyre!("{e}"))?,
    };
    if !text.ends_with('\n') {
        text.push('\n');
    }
    Ok(text)
}

/// Write `value` where the output arguments say
pub fn emit<T: Serialize>(value: &T, output: &OutputArgs) -> color_eyre::Result<()> {
    emit_text(&render(value, output.format)?, output)
}

/// Write already rendered text where the output arguments say
pub fn emit_text(text: &str, output: &OutputArgs) -> color_eyre::Result<()> {
    match &output.out {
        Some(path) => {
            atomic_write(path, text)
                .wrap_err_with(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "wrote output");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_render_formats() {
        let value = BTreeMap::from([("impact", 6.0)]);
        assert_eq!(
            render(&value, OutputFormat::Json).unwrap(),
            "{\n  \"impact\": 6.0\n}\n"
        );
        let yaml = render(&value, OutputFormat::Yaml).unwrap();
        assert!(yaml.starts_with("impact: 6"), "{yaml}");
        assert!(yaml.ends_with('\n'));
    }
}
