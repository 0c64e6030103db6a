pub(crate) mod confirm;
pub(crate) mod form;
pub(crate) mod modal;
pub(crate) mod progress;
pub(crate) mod record_table;
pub(crate) mod spinner;
pub(crate) mod text;
