//! Shell command classification.
//!
//! A pure function from a command string to `{safe, destructive}`.
//! Projects can extend the built-in tables with a
//! `command-policy.{json,yaml}` file in the orchestration directory;
//! project patterns take precedence over built-ins.
//!
//! Hard rules, in order:
//! 1. any `<` or `>` is destructive (unknown redirection target),
//!    regardless of policy;
//! 2. project safe patterns, then project destructive patterns;
//! 3. built-in safe patterns, then built-in destructive patterns;
//! 4. default destructive.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::config::OrchestrationPaths;

/// Classification result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandClass {
    Safe,
    Destructive,
}

impl CommandClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandClass::Safe => "safe",
            CommandClass::Destructive => "destructive",
        }
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(err) => {
                tracing::warn!(pattern = p, error = %err, "invalid builtin command pattern");
                None
            }
        })
        .collect()
}

/// Listing, reading, VCS inspection, environment queries.
static BUILTIN_SAFE: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"^ls($|\s)",
        r"^dir($|\s)",
        r"^cat\s",
        r"^head($|\s)",
        r"^tail($|\s)",
        r"^wc($|\s)",
        r"^grep\s",
        r"^rg\s",
        r"^find\s",
        r"^file\s",
        r"^stat\s",
        r"^du($|\s)",
        r"^df($|\s)",
        r"^tree($|\s)",
        r"^pwd$",
        r"^echo($|\s)",
        r"^which\s",
        r"^type\s",
        r"^whoami$",
        r"^hostname$",
        r"^uname($|\s)",
        r"^date($|\s)",
        r"^env($|\s)",
        r"^printenv($|\s)",
        r"^git\s+(status|diff|log|show|branch|tag|remote|blame|describe|shortlog)($|\s)",
    ])
});

/// Removal, moving, copying, package mutations, builds, privileged VCS
/// mutations, in-place edits.
static BUILTIN_DESTRUCTIVE: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(^|\s)rm($|\s)",
        r"(^|\s)rmdir($|\s)",
        r"(^|\s)unlink($|\s)",
        r"(^|\s)mv\s",
        r"(^|\s)cp\s",
        r"(^|\s)dd\s",
        r"(^|\s)shred($|\s)",
        r"(^|\s)truncate\s",
        r"(^|\s)chmod\s",
        r"(^|\s)chown\s",
        r"^npm\s+(install|uninstall|update|ci|publish|prune)($|\s)",
        r"^yarn\s+(add|remove|install|upgrade)($|\s)",
        r"^pnpm\s+(add|remove|install|update)($|\s)",
        r"^pip3?\s+(install|uninstall)($|\s)",
        r"^cargo\s+(build|install|add|remove|publish|clean|update)($|\s)",
        r"^make($|\s)",
        r"^go\s+(build|install|get)($|\s)",
        r"^git\s+(push|pull|fetch|commit|merge|rebase|reset|checkout|restore|revert|clean|add|rm|mv|stash|cherry-pick)($|\s)",
        r"(^|\s)sed\s+(-[a-z]*i|--in-place)",
        r"(^|\s)perl\s+-[a-z]*i",
        r"(^|\s)sudo\s",
    ])
});

/// Project pattern overrides loaded from `command-policy.{json,yaml}`.
#[derive(Debug, Default)]
pub struct CommandPolicy {
    safe: Vec<Regex>,
    destructive: Vec<Regex>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPolicy {
    #[serde(default)]
    safe: Vec<String>,

    #[serde(default)]
    destructive: Vec<String>,
}

impl CommandPolicy {
    /// Load the policy file from the orchestration directory; JSON wins
    /// over YAML when both exist. A missing file is an empty policy;
    /// an unreadable or unparseable file is logged and ignored.
    pub fn load(paths: &OrchestrationPaths) -> Self {
        if let Some(policy) = Self::load_file(&paths.command_policy_json(), FileFormat::Json) {
            return policy;
        }
        if let Some(policy) = Self::load_file(&paths.command_policy_yaml(), FileFormat::Yaml) {
            return policy;
        }
        Self::default()
    }

    fn load_file(path: &Path, format: FileFormat) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        let raw: RawPolicy = match format {
            FileFormat::Json => match serde_json::from_str(&content) {
                Ok(raw) => raw,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "bad command policy");
                    return None;
                }
            },
            FileFormat::Yaml => match serde_yaml::from_str(&content) {
                Ok(raw) => raw,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "bad command policy");
                    return None;
                }
            },
        };
        Some(Self::from_raw(raw))
    }

    fn from_raw(raw: RawPolicy) -> Self {
        let compile_user = |patterns: Vec<String>| {
            patterns
                .into_iter()
                .filter_map(|p| match Regex::new(&p) {
                    Ok(re) => Some(re),
                    Err(err) => {
                        tracing::warn!(pattern = p, error = %err, "invalid policy pattern");
                        None
                    }
                })
                .collect()
        };
        Self {
            safe: compile_user(raw.safe),
            destructive: compile_user(raw.destructive),
        }
    }

    /// Build a policy directly from pattern lists (tests, embedding).
    pub fn from_patterns(safe: &[&str], destructive: &[&str]) -> Self {
        Self::from_raw(RawPolicy {
            safe: safe.iter().map(|s| s.to_string()).collect(),
            destructive: destructive.iter().map(|s| s.to_string()).collect(),
        })
    }
}

enum FileFormat {
    Json,
    Yaml,
}

/// Strip a shell-wrapper invocation down to the inner command:
/// `bash -c "git status"` classifies as `git status`.
pub fn unwrap_shell_wrapper(command: &str) -> &str {
    static WRAPPER: Lazy<Regex> = Lazy::new(|| {
        #[expect(clippy::unwrap_used)]
        let re = Regex::new(
            r#"(?i)^(?:[a-z0-9_./\\-]*(?:bash|sh|zsh|pwsh|powershell(?:\.exe)?|cmd(?:\.exe)?))\s+(?:-l?c|-command|/c)\s+(.+)$"#,
        )
        .unwrap();
        re
    });

    let trimmed = command.trim();
    let Some(captures) = WRAPPER.captures(trimmed) else {
        return trimmed;
    };
    let Some(inner) = captures.get(1) else {
        return trimmed;
    };

    let inner = inner.as_str().trim();
    // Strip one matching layer of quotes around the inner command.
    for quote in ['"', '\''] {
        if inner.len() >= 2 && inner.starts_with(quote) && inner.ends_with(quote) {
            return &inner[1..inner.len() - 1];
        }
    }
    inner
}

/// Classify a command string. Pure; the policy is loaded separately.
pub fn classify_command(command: &str, policy: &CommandPolicy) -> CommandClass {
    classify_command_debug(command, policy, &mut |_| {})
}

/// Debug variant: identical behavior, but emits one line per decision
/// branch into `log`.
pub fn classify_command_debug(
    command: &str,
    policy: &CommandPolicy,
    log: &mut dyn FnMut(String),
) -> CommandClass {
    let normalized = command.trim().to_lowercase();

    if normalized.contains('<') || normalized.contains('>') {
        log("redirection operator present -> destructive".to_string());
        return CommandClass::Destructive;
    }

    for re in &policy.safe {
        if re.is_match(&normalized) {
            log(format!("project safe pattern '{re}' matched -> safe"));
            return CommandClass::Safe;
        }
    }
    for re in &policy.destructive {
        if re.is_match(&normalized) {
            log(format!("project destructive pattern '{re}' matched -> destructive"));
            return CommandClass::Destructive;
        }
    }

    for re in BUILTIN_SAFE.iter() {
        if re.is_match(&normalized) {
            log(format!("builtin safe pattern '{re}' matched -> safe"));
            return CommandClass::Safe;
        }
    }
    for re in BUILTIN_DESTRUCTIVE.iter() {
        if re.is_match(&normalized) {
            log(format!("builtin destructive pattern '{re}' matched -> destructive"));
            return CommandClass::Destructive;
        }
    }

    log("no pattern matched -> destructive by default".to_string());
    CommandClass::Destructive
}
