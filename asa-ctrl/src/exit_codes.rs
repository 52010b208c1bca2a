use proc_exit::Code;

pub const OK: Code = Code::SUCCESS;
pub const FAILURE: Code = Code::FAILURE;
pub const CORRUPTED_MODS_DATABASE: Code = Code::new(2);
pub const MOD_ALREADY_ENABLED: Code = Code::new(3);
pub const RCON_PASSWORD_NOT_FOUND: Code = Code::new(4);
pub const RCON_PASSWORD_WRONG: Code = Code::new(5);
pub const RCON_COMMAND_EXECUTION_FAILED: Code = Code::new(6);
pub const RCON_PORT_NOT_FOUND: Code = Code::new(7);
pub const RCON_DISABLED: Code = Code::new(8);
pub const RCON_TIMEOUT: Code = Code::new(9);
