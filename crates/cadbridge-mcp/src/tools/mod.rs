//! Tool argument schemas
//!
//! - Documents (create_document, list_documents)
//! - Objects (create_object, edit_object, delete_object, get_objects, get_object)
//! - Code (execute_code)
//! - Parts library (insert_part_from_library, get_parts_list)
//! - Views (get_view)

pub mod code;
pub mod document;
pub mod object;
pub mod parts;
pub mod view;
