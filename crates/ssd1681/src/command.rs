// SSD1681 command definitions

// Initialization and reset
pub const DRIVER_OUTPUT_CONTROL: u8 = 0x01; // Driver output control
pub const DATA_ENTRY_MODE: u8 = 0x11; // Data entry mode
pub const SOFT_RESET: u8 = 0x12; // Soft reset
pub const TEMP_SENSOR_CONTROL: u8 = 0x18; // Temperature sensor control
pub const BORDER_WAVEFORM: u8 = 0x3C; // Border waveform control

// RAM and buffer management
pub const WRITE_RAM_BW: u8 = 0x24; // Write to BW RAM (current frame)
pub const WRITE_RAM_RED: u8 = 0x26; // Write to RED RAM (previous frame for partial refresh)
pub const SET_RAM_X_RANGE: u8 = 0x44; // Set RAM X address range (bytes)
pub const SET_RAM_Y_RANGE: u8 = 0x45; // Set RAM Y address range (lines)
pub const AUTO_WRITE_BW_RAM: u8 = 0x46; // Auto write BW RAM
pub const AUTO_WRITE_RED_RAM: u8 = 0x47; // Auto write RED RAM
pub const SET_RAM_X_COUNTER: u8 = 0x4E; // Set RAM X address counter
pub const SET_RAM_Y_COUNTER: u8 = 0x4F; // Set RAM Y address counter

// Display update and refresh
pub const MASTER_ACTIVATION: u8 = 0x20; // Master activation
pub const DISPLAY_UPDATE_CTRL1: u8 = 0x21; // Display update control 1
pub const DISPLAY_UPDATE_CTRL2: u8 = 0x22; // Display update control 2
pub const CTRL1_NORMAL: u8 = 0x00; // Normal mode - compare RED vs BW for partial
pub const CTRL1_BYPASS_RED: u8 = 0x40; // Bypass RED RAM (treat as 0) - for full refresh

// Auto write pattern: all pixels white
pub const AUTO_WRITE_WHITE: u8 = 0xF7;
