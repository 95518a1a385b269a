// Identity-provider webhooks (Clerk, delivered through Svix).
// verifier authenticates, normalizer maps the payload to a canonical user,
// handlers exposes POST /api/webhooks.

pub mod event;
pub mod handlers;
pub mod normalizer;
pub mod verifier;
