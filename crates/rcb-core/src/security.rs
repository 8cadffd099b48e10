use crate::domain::UserId;

// ============== Authorization ==============

/// Single-operator policy: only the configured identity may issue commands.
/// Updates without a sender never match.
pub fn is_authorized(user_id: Option<UserId>, allowed_user: UserId) -> bool {
    user_id == Some(allowed_user)
}
