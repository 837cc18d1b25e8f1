use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

use crate::cmdline::{CmdlineError, find_duplicated_params, param_key};

/// The variable in `/etc/default/grub` that holds the default kernel command line.
pub const GRUB_CMDLINE_KEY: &str = "GRUB_CMDLINE_LINUX_DEFAULT";

/// Errors that can occur when rewriting `/etc/default/grub`.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum GrubError {
    /// There is nothing to add to the kernel command line.
    #[error("no parameters to inject")]
    NoParameters,

    /// The command line already in the file is inconsistent.
    #[error("invalid existing parameters: {0}")]
    InvalidExistingParameters(#[source] CmdlineError),
}

/// The outcome of [`update_grub_default()`].
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct GrubUpdate {
    /// The complete new file contents.
    pub contents: String,

    /// The default kernel command line before the update.
    pub old_cmdline: String,

    /// The default kernel command line after the update.
    pub new_cmdline: String,
}

/// Reads the `KEY=VALUE` assignments of a `/etc/default/grub` style file.
///
/// Blank lines and `#` comments are skipped. One pair of surrounding double quotes is removed
/// from each value. Later assignments of the same key win, as they do when the shell sources
/// the file.
#[must_use]
pub fn parse_grub_default(contents: &str) -> BTreeMap<String, String> {
    contents
        .lines()
        .filter_map(parse_assignment)
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn parse_assignment(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();

    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (key, value) = line.split_once('=')?;

    Some((key, unquote(value)))
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|value| value.strip_suffix('"'))
        .unwrap_or(value)
}

/// Adds `params` to the default kernel command line in the contents of `/etc/default/grub`.
///
/// Existing parameters with the same name as a new one are replaced; everything else on the line
/// is preserved, as are all other lines of the file. If the file has no
/// [`GRUB_CMDLINE_KEY`] assignment, one is appended.
///
/// Fails if `params` is empty or if the existing command line gives one parameter two different
/// values, since it would be unclear which one to keep.
///
/// ```
/// let update = rt_conf::update_grub_default(
///     "GRUB_TIMEOUT=5\nGRUB_CMDLINE_LINUX_DEFAULT=\"quiet isolcpus=1\"\n",
///     &["isolcpus=2-3".to_string()],
/// )
/// .unwrap();
///
/// assert_eq!(update.new_cmdline, "quiet isolcpus=2-3");
/// assert_eq!(
///     update.contents,
///     "GRUB_TIMEOUT=5\nGRUB_CMDLINE_LINUX_DEFAULT=\"quiet isolcpus=2-3\"\n"
/// );
/// ```
pub fn update_grub_default(contents: &str, params: &[String]) -> Result<GrubUpdate, GrubError> {
    if params.is_empty() {
        return Err(GrubError::NoParameters);
    }

    let old_cmdline = parse_grub_default(contents)
        .remove(GRUB_CMDLINE_KEY)
        .unwrap_or_default();

    find_duplicated_params(&old_cmdline).map_err(GrubError::InvalidExistingParameters)?;

    let new_cmdline = old_cmdline
        .split_whitespace()
        .filter(|existing| {
            !params
                .iter()
                .any(|param| param_key(param) == param_key(existing))
        })
        .chain(params.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ");

    let new_line = format!("{GRUB_CMDLINE_KEY}=\"{new_cmdline}\"");

    let mut replaced = false;
    let mut lines = Vec::new();

    for line in contents.lines() {
        if parse_assignment(line).is_some_and(|(key, _)| key == GRUB_CMDLINE_KEY) {
            // Shadowed assignments are rewritten too.
            lines.push(new_line.as_str());
            replaced = true;
        } else {
            lines.push(line);
        }
    }

    if !replaced {
        lines.push(new_line.as_str());
    }

    let mut contents = lines.join("\n");
    contents.push('\n');

    Ok(GrubUpdate {
        contents,
        old_cmdline,
        new_cmdline,
    })
}

/// Operator-facing summary of a GRUB update, one line per entry.
#[must_use]
pub fn grub_conclusion(grub_file: &Path, update: &GrubUpdate) -> Vec<String> {
    vec![
        "Detected bootloader: GRUB".to_string(),
        "Default kernel command line:".to_string(),
        format!("-  {}", update.old_cmdline),
        "New kernel command line:".to_string(),
        format!("+  {}", update.new_cmdline),
        format!("Updated default grub file: {}", grub_file.display()),
        String::new(),
        "Please run:".to_string(),
        String::new(),
        "\tsudo update-grub".to_string(),
        String::new(),
        "to apply the changes to your bootloader.".to_string(),
    ]
}
