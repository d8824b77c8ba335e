//! 隐私策略：判断某个用户邀请目标用户时的处理结果
//!
//! 判定顺序：无设置 → 待处理；黑名单 → 拒绝；白名单 → 自动接受；
//! 私密模式下仅 `allowed` 中的用户自动接受，其余拒绝；公开模式 → 待处理。

use crate::hub::settings::models::{PrivacyMode, UserSettings};
use serde::Serialize;

/// 邀请判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Deny,
    AutoAccept,
    Pending,
}

/// 以 `actor` 为邀请方，按目标用户的设置计算判定结果（纯函数）
pub fn evaluate(settings: Option<&UserSettings>, actor: &str) -> Decision {
    let Some(settings) = settings else {
        return Decision::Pending;
    };
    let privacy = &settings.privacy;

    if privacy.blacklisted.contains(actor) {
        return Decision::Deny;
    }
    if privacy.whitelisted.contains(actor) {
        return Decision::AutoAccept;
    }
    if privacy.mode == PrivacyMode::Private {
        return if privacy.allowed.contains(actor) {
            Decision::AutoAccept
        } else {
            Decision::Deny
        };
    }
    Decision::Pending
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTOR: &str = "actor";

    fn settings() -> UserSettings {
        UserSettings::defaults_for("target")
    }

    #[test]
    fn absent_settings_are_pending() {
        assert_eq!(evaluate(None, ACTOR), Decision::Pending);
    }

    #[test]
    fn public_default_is_pending() {
        assert_eq!(evaluate(Some(&settings()), ACTOR), Decision::Pending);
    }

    #[test]
    fn blacklist_wins_over_whitelist() {
        let mut s = settings();
        s.privacy.blacklisted.insert(ACTOR.to_string());
        s.privacy.whitelisted.insert(ACTOR.to_string());
        assert_eq!(evaluate(Some(&s), ACTOR), Decision::Deny);
    }

    #[test]
    fn whitelist_accepts_even_when_private() {
        let mut s = settings();
        s.privacy.mode = PrivacyMode::Private;
        s.privacy.whitelisted.insert(ACTOR.to_string());
        assert_eq!(evaluate(Some(&s), ACTOR), Decision::AutoAccept);
    }

    #[test]
    fn private_mode_only_admits_allowed() {
        let mut s = settings();
        s.privacy.mode = PrivacyMode::Private;
        assert_eq!(evaluate(Some(&s), ACTOR), Decision::Deny);

        s.privacy.allowed.insert(ACTOR.to_string());
        assert_eq!(evaluate(Some(&s), ACTOR), Decision::AutoAccept);
    }

    #[test]
    fn blacklist_wins_over_allowed_in_private_mode() {
        let mut s = settings();
        s.privacy.mode = PrivacyMode::Private;
        s.privacy.allowed.insert(ACTOR.to_string());
        s.privacy.blacklisted.insert(ACTOR.to_string());
        assert_eq!(evaluate(Some(&s), ACTOR), Decision::Deny);
    }
}
