mod command_input;
mod input;
mod key_result;
mod paged_table;
mod search_input;

pub use command_input::{CommandEvent, CommandInput};
pub use input::{InputResult, TextInput};
pub use key_result::KeyResult;
pub use paged_table::{PagedTable, TableEvent, TableRow};
pub use search_input::{SearchEvent, SearchInput};
