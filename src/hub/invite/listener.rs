//! 邀请监听器回调接口

use crate::hub::invite::models::ListInvite;
use async_trait::async_trait;

/// 邀请监听器（外部投递组件在此接入推送或邮件）
#[async_trait]
pub trait InviteListener: Send + Sync {
    /// 为已注册用户创建了待处理邀请
    async fn on_invites_created(&self, invites: Vec<ListInvite>);

    /// 为未注册邮箱创建了邀请记录
    async fn on_mail_invite(&self, invite: ListInvite);
}

/// 默认空实现（无操作）
pub struct EmptyInviteListener;

#[async_trait]
impl InviteListener for EmptyInviteListener {
    async fn on_invites_created(&self, _invites: Vec<ListInvite>) {
        // 默认不做任何处理
    }

    async fn on_mail_invite(&self, _invite: ListInvite) {
        // 默认不做任何处理
    }
}
