// abc-core/src/domain/features.rs

use serde::{Deserialize, Serialize};

/// Behavior switches set by the upgrade chain.
///
/// Each flag disables a semantic that did not exist when the document's
/// api_version was current. A document authored natively under the newest
/// api_version has every flag false.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Features {
    /// Golden tests do not capture printed output under `data/.abc/stdout`.
    pub skip_stdout: bool,

    /// Include paths are literal, never glob patterns.
    pub skip_globs: bool,

    /// The `_git_tag` / `_git_sha` / `_git_short_sha` builtins are absent.
    pub skip_git_vars: bool,

    /// Recorded files beginning with `.git` keep their name instead of
    /// gaining the `.abc_renamed` suffix.
    pub skip_abc_renamed: bool,
}

impl Features {
    /// Monotone merge: a flag set anywhere in the chain stays set.
    pub fn merge(&self, other: &Features) -> Features {
        Features {
            skip_stdout: self.skip_stdout || other.skip_stdout,
            skip_globs: self.skip_globs || other.skip_globs,
            skip_git_vars: self.skip_git_vars || other.skip_git_vars,
            skip_abc_renamed: self.skip_abc_renamed || other.skip_abc_renamed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_is_monotone() {
        let a = Features {
            skip_stdout: true,
            ..Default::default()
        };
        let b = Features {
            skip_globs: true,
            ..Default::default()
        };
        let merged = a.merge(&b);
        assert!(merged.skip_stdout);
        assert!(merged.skip_globs);
        assert!(!merged.skip_git_vars);
    }

    #[test]
    fn test_deserialize_rejects_unknown_flag() {
        let err = serde_yaml::from_str::<Features>("skip_everything: true");
        assert!(err.is_err());
    }
}
