mod deploy;
mod edit;
mod list;
mod preset;
mod rename;
mod scan;
mod select;
mod source;
mod status;
mod tags;
mod target;
mod util;

pub use deploy::deploy;
pub use edit::{edit, EditFields};
pub use list::list;
pub use preset::preset;
pub use rename::rename;
pub use scan::scan;
pub use select::{deselect, select};
pub use source::source;
pub use status::{conflicts, status};
pub use tags::{categories, tags};
pub use target::target;
