//! Station interface abstraction layer

pub mod mock_backend;
pub mod wifi_backend;
pub mod wifi_ctrl_backend;

pub use mock_backend::MockWifiBackend;
pub use wifi_backend::StationInterface;
pub use wifi_ctrl_backend::WifiCtrlBackend;
