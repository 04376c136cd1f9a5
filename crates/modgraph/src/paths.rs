//! Path token expansion for descriptor paths
//!
//! Include paths, framework archives and receipt values may reference the
//! directories a descriptor declares through `$(ModuleDir)`, `$(PluginDir)`
//! and `$(ProjectDir)`. Expansion happens once, at load time.

use thiserror::Error;

/// Errors that can occur while expanding a descriptor path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// Token used but the directory it stands for was not declared
    #[error("{token} is used but the descriptor declares no {field}")]
    Undeclared {
        token: &'static str,
        field: &'static str,
    },

    /// `$(...)` token that is not one of the known ones
    #[error("Unknown path token: $({0})")]
    UnknownToken(String),

    /// `$(` without a closing parenthesis
    #[error("Unterminated path token in: {0}")]
    Unterminated(String),
}

/// Directories a path may refer to
#[derive(Debug, Clone, Default)]
pub struct PathContext<'a> {
    pub project_dir: Option<&'a str>,
    pub module_dir: Option<&'a str>,
    pub plugin_dir: Option<&'a str>,
}

impl<'a> PathContext<'a> {
    fn lookup(&self, token: &str) -> Result<&'a str, PathError> {
        let (value, token, field) = match token {
            "ModuleDir" => (self.module_dir, "$(ModuleDir)", "directory"),
            "PluginDir" => (self.plugin_dir, "$(PluginDir)", "plugin_directory"),
            "ProjectDir" => (self.project_dir, "$(ProjectDir)", "project root"),
            other => return Err(PathError::UnknownToken(other.to_string())),
        };
        value.ok_or(PathError::Undeclared { token, field })
    }

    /// Expand every token in `raw` and normalize the result
    pub fn expand(&self, raw: &str) -> Result<String, PathError> {
        if !raw.contains("$(") {
            return Ok(normalize(raw));
        }

        let mut out = String::with_capacity(raw.len());
        let mut rest = raw;
        while let Some(start) = rest.find("$(") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find(')')
                .ok_or_else(|| PathError::Unterminated(raw.to_string()))?;
            out.push_str(self.lookup(&after[..end])?);
            rest = &after[end + 1..];
        }
        out.push_str(rest);

        Ok(normalize(&out))
    }
}

/// Normalize a path string: `/` separators, `.` dropped, `..` folded
///
/// Leading `..` components of a relative path are kept since there is
/// nothing to fold them into.
pub fn normalize(path: &str) -> String {
    let absolute = path.starts_with('/') || path.starts_with('\\');
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split(|c| c == '/' || c == '\\') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            _ => parts.push(part),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}
