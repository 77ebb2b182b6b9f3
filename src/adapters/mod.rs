//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements            | Connects to                   |
//! |--------------|-----------------------|-------------------------------|
//! | `csv_logger` | TransportPort         | Any `std::io::Write` stream   |
//! | `hardware`   | SensorPort            | Simulated sensor + plant      |
//! |              | ActuatorPort, DelayNs | Simulated PWM timer           |
//! | `log_sink`   | EventSink             | `log` facade                  |
//! | `pwm`        | ActuatorPort          | `embedded-hal` PWM channel    |
//! | `time`       | Clock                 | `std::time::Instant`          |

pub mod csv_logger;
pub mod hardware;
pub mod log_sink;
pub mod pwm;
pub mod time;
