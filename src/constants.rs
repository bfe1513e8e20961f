// Identifier constants
pub const DEFAULT_NAMESPACE: &str = "minecraft";

// World constants
pub const CHUNK_SIZE: i32 = 16;
pub const WORLD_MIN_Y: i32 = -64;
pub const WORLD_HEIGHT: i32 = 384;
pub const WORLD_MAX_Y: i32 = WORLD_MIN_Y + WORLD_HEIGHT;
pub const SEA_LEVEL: i32 = 63;

// Structure constants
pub const PLANNING_HEIGHT: i32 = 90;

// Datagen constants
pub const DATA_DIRECTORY: &str = "data";
pub const ASSETS_DIRECTORY: &str = "assets";
pub const DEFAULT_OUTPUT_DIR: &str = "generated";

// Files
pub const DEFAULT_SETTINGS_FILE: &str = "minegen.json";
pub const PIECE_FILE_EXTENSION: &str = "mgp";
pub const DEFAULT_PIECE_FILE: &str = "pieces.mgp";
