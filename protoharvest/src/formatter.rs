use colored::*;
use protoharvest_core::client::{ClientConnectError, Discovery, DiscoveryError};
use protoharvest_core::compiler::CompileError;
use protoharvest_core::emit::{EmitError, EmitReport};

use crate::harvest::HarvestError;

/// A wrapper struct for a formatted, colored string.
///
/// Implements `Display` so it can be printed directly.
pub struct FormattedString(pub String);

impl std::fmt::Display for FormattedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}", self.0)?;
        Ok(())
    }
}

impl From<HarvestError> for FormattedString {
    fn from(err: HarvestError) -> Self {
        match err {
            HarvestError::Connect(err) => err.into(),
            HarvestError::Discovery(err) => err.into(),
            HarvestError::Emit(err) => err.into(),
            HarvestError::Compile(err) => err.into(),
        }
    }
}

impl From<ClientConnectError> for FormattedString {
    fn from(err: ClientConnectError) -> Self {
        FormattedString(format!("{}\n\n'{}'", "Connection Error:".red().bold(), err))
    }
}

impl From<DiscoveryError> for FormattedString {
    fn from(err: DiscoveryError) -> Self {
        FormattedString(format!("{}\n\n'{}'", "Discovery Failed:".red().bold(), err))
    }
}

impl From<EmitError> for FormattedString {
    fn from(err: EmitError) -> Self {
        FormattedString(format!(
            "{}\n\n'{}'",
            "Failed to write artifacts:".red().bold(),
            err
        ))
    }
}

impl From<CompileError> for FormattedString {
    fn from(err: CompileError) -> Self {
        FormattedString(format!(
            "{}\n\n{}",
            "Compilation Failed:".red().bold(),
            err
        ))
    }
}

impl From<&Discovery> for FormattedString {
    fn from(discovery: &Discovery) -> Self {
        if discovery.services.is_empty() {
            return FormattedString("No services found.".yellow().to_string());
        }

        let mut out = String::new();
        out.push_str("Services:\n");
        for service in &discovery.services {
            out.push_str(&format!(
                "  - {} ({})\n",
                service.full_name().green(),
                service.parent_file().name()
            ));
        }

        out.push_str("\nSchema Files:\n");
        for name in discovery.files.names() {
            out.push_str(&format!("  - {}\n", name.green()));
        }

        FormattedString(out.trim_end().to_string())
    }
}

impl From<&EmitReport> for FormattedString {
    fn from(report: &EmitReport) -> Self {
        FormattedString(format!(
            "{} {} schema files\n  {}\n  {}",
            "Wrote".green().bold(),
            report.schema_files.len(),
            report.manifest.display(),
            report.routes.display()
        ))
    }
}
