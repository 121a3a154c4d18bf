//! Biblioteca Rust para el medidor de energía ADE7953 de Analog Devices
//!
//! Esta biblioteca proporciona una interfaz para el ADE7953, un front-end de
//! medida de energía monofásica con dos canales de corriente. Expone medidas
//! calibradas de tensión, corriente, potencia activa, energía, frecuencia y
//! factor de potencia sobre I2C o SPI.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use embedded_hal::spi::SpiDevice;

// Importaciones internas
pub mod config;
pub mod conversion;
pub mod device;
pub mod interface;
pub mod register;

// Re-exports públicos
pub use config::{Ade7953Config, PgaGain};
pub use conversion::{period_raw_to_hertz, pf_raw_to_factor};
pub use device::{Ade7953, Ade7953Error};
pub use interface::{I2cInterface, SpiInterface, DEFAULT_I2C_ADDR};

/// Crea un dispositivo ADE7953 sobre el bus I2C y ejecuta su arranque.
///
/// La interfaz I2C necesita su propio delay para la pausa entre
/// transacciones del chip, de ahí el requisito de `Clone`.
pub fn new_i2c_device<I, D, E>(
    i2c: I,
    address: u8,
    delay: D,
    config: &Ade7953Config,
) -> Result<Ade7953<I2cInterface<I, D>, D>, Ade7953Error>
where
    I: I2c<Error = E>,
    D: DelayNs + Clone,
{
    let interface = I2cInterface::new(i2c, address, delay.clone());
    Ade7953::new(interface, delay, config)
}

/// Crea un dispositivo ADE7953 sobre un dispositivo SPI y ejecuta su arranque
pub fn new_spi_device<SPI, D, E>(
    spi: SPI,
    delay: D,
    config: &Ade7953Config,
) -> Result<Ade7953<SpiInterface<SPI>, D>, Ade7953Error>
where
    SPI: SpiDevice<Error = E>,
    D: DelayNs,
{
    let interface = SpiInterface::new(spi);
    Ade7953::new(interface, delay, config)
}
