pub(super) mod build;
pub(super) mod interaction;
pub(super) mod view;
