//! Módulo de abstracción para interfaces de comunicación con el ADE7953
//!
//! El chip habla I2C o SPI con el mismo mapa de registros; cada variante
//! encuadra la dirección de 16 bits a su manera. La variante se elige al
//! crear el dispositivo y no cambia en tiempo de ejecución.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use embedded_hal::spi::{Operation, SpiDevice};

/// Dirección I2C de 7 bits del ADE7953
pub const DEFAULT_I2C_ADDR: u8 = 0x38;

/// Marcador de dirección de lectura en el tercer byte de la cabecera SPI
const SPI_READ_MARKER: u8 = 0x80;
/// Pausa entre transacciones I2C que exige el chip, en microsegundos
const I2C_INTER_TXN_DELAY_US: u32 = 5;

/// Error genérico para interfaces de comunicación
#[derive(Debug, Clone)]
pub enum InterfaceError<E> {
    /// Error de comunicación I2C
    I2cError(E),
    /// Error de comunicación SPI
    SpiError(E),
    /// Parámetro inválido
    InvalidParameter,
}

/// Trait para abstraer la comunicación con el ADE7953.
///
/// `data` lleva los bytes del valor ya serializados (byte más significativo
/// primero); la implementación añade la dirección y el encuadre propio del
/// bus.
pub trait Interface {
    /// Tipo de error que puede producir la interfaz
    type Error;

    /// Escribe un registro
    fn write_reg(&mut self, reg: u16, data: &[u8]) -> Result<(), Self::Error>;

    /// Lee un registro
    fn read_reg(&mut self, reg: u16, data: &mut [u8]) -> Result<(), Self::Error>;
}

/// Implementación de Interface para I2C
pub struct I2cInterface<I2C, D> {
    i2c: I2C,
    addr: u8,
    delay: D,
}

impl<I2C, D, E> I2cInterface<I2C, D>
where
    I2C: I2c<Error = E>,
    D: DelayNs,
{
    /// Crea una nueva interfaz I2C en la dirección de 7 bits dada
    pub fn new(i2c: I2C, addr: u8, delay: D) -> Self {
        Self { i2c, addr, delay }
    }

    /// Consume la interfaz y devuelve el dispositivo I2C subyacente
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C, D, E> Interface for I2cInterface<I2C, D>
where
    I2C: I2c<Error = E>,
    D: DelayNs,
{
    type Error = InterfaceError<E>;

    fn write_reg(&mut self, reg: u16, data: &[u8]) -> Result<(), Self::Error> {
        if data.len() > 4 {
            return Err(InterfaceError::InvalidParameter);
        }

        // [addr_hi, addr_lo, valor...] en una sola transacción con stop
        let mut buffer = [0u8; 6];
        buffer[0] = (reg >> 8) as u8;
        buffer[1] = reg as u8;
        buffer[2..2 + data.len()].copy_from_slice(data);

        self.i2c
            .write(self.addr, &buffer[..2 + data.len()])
            .map_err(InterfaceError::I2cError)
    }

    fn read_reg(&mut self, reg: u16, data: &mut [u8]) -> Result<(), Self::Error> {
        // Dirección sin stop, lectura con stop y después la pausa del chip
        self.i2c
            .write_read(self.addr, &[(reg >> 8) as u8, reg as u8], data)
            .map_err(InterfaceError::I2cError)?;
        self.delay.delay_us(I2C_INTER_TXN_DELAY_US);
        Ok(())
    }
}

/// Implementación de Interface para SPI.
///
/// El chip-select pertenece al `SpiDevice`; cada operación es una única
/// transacción con el CS activo de principio a fin.
pub struct SpiInterface<SPI> {
    spi: SPI,
}

impl<SPI, E> SpiInterface<SPI>
where
    SPI: SpiDevice<Error = E>,
{
    /// Crea una nueva interfaz SPI
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Consume la interfaz y devuelve el dispositivo SPI subyacente
    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI, E> Interface for SpiInterface<SPI>
where
    SPI: SpiDevice<Error = E>,
{
    type Error = InterfaceError<E>;

    fn write_reg(&mut self, reg: u16, data: &[u8]) -> Result<(), Self::Error> {
        if data.len() > 4 {
            return Err(InterfaceError::InvalidParameter);
        }

        // [addr_hi, addr_lo, 0x00, valor...]; el tercer byte marca escritura
        let mut buffer = [0u8; 7];
        buffer[0] = (reg >> 8) as u8;
        buffer[1] = reg as u8;
        buffer[2] = 0x00;
        buffer[3..3 + data.len()].copy_from_slice(data);

        self.spi
            .write(&buffer[..3 + data.len()])
            .map_err(InterfaceError::SpiError)
    }

    fn read_reg(&mut self, reg: u16, data: &mut [u8]) -> Result<(), Self::Error> {
        let header = [(reg >> 8) as u8, reg as u8, SPI_READ_MARKER];
        self.spi
            .transaction(&mut [Operation::Write(&header), Operation::Read(data)])
            .map_err(InterfaceError::SpiError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::i2c;
    use embedded_hal::spi;

    struct NoopDelay;

    impl DelayNs for NoopDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    #[derive(Default)]
    struct FakeI2cBus {
        writes: Vec<(u8, Vec<u8>)>,
        reads: Vec<(u8, usize)>,
        read_data: Vec<u8>,
    }

    impl i2c::ErrorType for FakeI2cBus {
        type Error = Infallible;
    }

    impl I2c for FakeI2cBus {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [i2c::Operation<'_>],
        ) -> Result<(), Self::Error> {
            for op in operations {
                match op {
                    i2c::Operation::Write(bytes) => {
                        self.writes.push((address, bytes.to_vec()));
                    }
                    i2c::Operation::Read(buf) => {
                        buf.copy_from_slice(&self.read_data[..buf.len()]);
                        self.reads.push((address, buf.len()));
                    }
                }
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeSpiBus {
        transactions: usize,
        written: Vec<Vec<u8>>,
        read_data: Vec<u8>,
    }

    impl spi::ErrorType for FakeSpiBus {
        type Error = Infallible;
    }

    impl SpiDevice for FakeSpiBus {
        fn transaction(
            &mut self,
            operations: &mut [spi::Operation<'_, u8>],
        ) -> Result<(), Self::Error> {
            self.transactions += 1;
            for op in operations {
                match op {
                    spi::Operation::Write(bytes) => self.written.push(bytes.to_vec()),
                    spi::Operation::Read(buf) => {
                        buf.copy_from_slice(&self.read_data[..buf.len()]);
                    }
                    _ => {}
                }
            }
            Ok(())
        }
    }

    #[test]
    fn test_i2c_encuadre_de_escritura() {
        let mut iface = I2cInterface::new(FakeI2cBus::default(), DEFAULT_I2C_ADDR, NoopDelay);
        iface.write_reg(0x102, &[0x00, 0x04]).unwrap();
        let bus = iface.release();
        assert_eq!(bus.writes, vec![(0x38, vec![0x01, 0x02, 0x00, 0x04])]);
    }

    #[test]
    fn test_i2c_encuadre_de_lectura() {
        let bus = FakeI2cBus {
            read_data: vec![0xDE, 0xAD, 0xBE, 0xEF],
            ..Default::default()
        };
        let mut iface = I2cInterface::new(bus, DEFAULT_I2C_ADDR, NoopDelay);
        let mut data = [0u8; 4];
        iface.read_reg(0x31C, &mut data).unwrap();
        assert_eq!(data, [0xDE, 0xAD, 0xBE, 0xEF]);
        let bus = iface.release();
        // Primero la dirección, después los datos
        assert_eq!(bus.writes, vec![(0x38, vec![0x03, 0x1C])]);
        assert_eq!(bus.reads, vec![(0x38, 4)]);
    }

    #[test]
    fn test_i2c_rechaza_valores_demasiado_largos() {
        let mut iface = I2cInterface::new(FakeI2cBus::default(), DEFAULT_I2C_ADDR, NoopDelay);
        assert!(matches!(
            iface.write_reg(0x102, &[0u8; 5]),
            Err(InterfaceError::InvalidParameter)
        ));
    }

    #[test]
    fn test_spi_encuadre_de_escritura() {
        let mut iface = SpiInterface::new(FakeSpiBus::default());
        iface.write_reg(0x0FE, &[0xAD]).unwrap();
        let bus = iface.release();
        assert_eq!(bus.written, vec![vec![0x00, 0xFE, 0x00, 0xAD]]);
        assert_eq!(bus.transactions, 1);
    }

    #[test]
    fn test_spi_encuadre_de_lectura() {
        let bus = FakeSpiBus {
            read_data: vec![0x12, 0x34],
            ..Default::default()
        };
        let mut iface = SpiInterface::new(bus);
        let mut data = [0u8; 2];
        iface.read_reg(0x10E, &mut data).unwrap();
        assert_eq!(data, [0x12, 0x34]);
        let bus = iface.release();
        // Cabecera con el marcador de lectura, en una única transacción
        assert_eq!(bus.written, vec![vec![0x01, 0x0E, 0x80]]);
        assert_eq!(bus.transactions, 1);
    }
}
