// Handlers are grouped by who may call them:
// public (no auth) → protected (account owner) → elevated (admin)
pub mod elevated;
pub mod protected;
pub mod public;
