pub mod game_state;
pub mod messages;
pub mod room;
pub mod types;

pub use game_state::{GameState, PlayerGameState};
pub use messages::{ClientMessage, Envelope, LogicalMessage};
pub use room::{hash_password, validate_create_request, verify_password, CreateRoomRequest, Room};
pub use types::{PlayerInfo, RoomId, RoomStatus, UserId, ROOM_ID_PREFIX};
