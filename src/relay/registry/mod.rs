mod in_memory_room_registry;
mod member;
mod registry_error;
mod room_registry;
pub use in_memory_room_registry::InMemoryRoomRegistry;
pub use member::{Departure, Member};
pub use registry_error::RegistryError;
pub use room_registry::RoomRegistry;
