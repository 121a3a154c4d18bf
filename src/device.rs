//! Dispositivo ADE7953: secuencia de arranque y accesores de medida

use crate::config::{Ade7953Config, PgaGain};
use crate::conversion;
use crate::interface::Interface;
use crate::register::{self, regs};
use embedded_hal::delay::DelayNs;

/// Valor de CONFIG que bloquea la interfaz de comunicación y activa el
/// filtro paso alto
const CONFIG_LOCK_HPF: i32 = 0x04;
/// Valor de desbloqueo del registro 0x0FE (datasheet, página 18)
const UNLOCK_MAGIC: i32 = 0xAD;
/// "Ajuste óptimo" del registro reservado 0x120 (datasheet, página 18)
const RESERVED_OPTIMUM: i32 = 0x30;
/// Modo de acumulación por ciclos de línea programado en el arranque
const LCYCMODE_DEFAULT: i32 = 0x40;

/// Intervalo entre sondeos del bit de reset, en milisegundos
const RESET_POLL_INTERVAL_MS: u32 = 10;
/// Número máximo de sondeos antes de declarar el reset perdido
const RESET_POLL_RETRIES: u32 = 100;

/// Errores del driver del ADE7953
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ade7953Error {
    /// Error de comunicación con el bus
    InterfaceError,
    /// Parámetro inválido (canal fuera de rango, escala nula...)
    InvalidParameter,
    /// El registro de versión no respondió durante la creación
    ProbeFailed,
    /// El chip no señaló el final del reset dentro del plazo
    Timeout,
}

impl Ade7953Error {
    pub fn from_error<E>(_error: E) -> Self {
        Ade7953Error::InterfaceError
    }
}

#[cfg(feature = "std")]
impl std::fmt::Display for Ade7953Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ade7953Error::InterfaceError => write!(f, "error de comunicación con el bus"),
            Ade7953Error::InvalidParameter => write!(f, "parámetro inválido"),
            Ade7953Error::ProbeFailed => write!(f, "el ADE7953 no responde"),
            Ade7953Error::Timeout => write!(f, "el reset del ADE7953 no terminó a tiempo"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Ade7953Error {}

/// Factores de calibración retenidos por el dispositivo
#[derive(Debug, Clone)]
pub struct Calibration {
    pub voltage_scale: f32,
    pub current_scale: [f32; 2],
    pub apower_scale: [f32; 2],
    pub aenergy_scale: [f32; 2],
}

/// Driver del ADE7953 sobre una interfaz I2C o SPI
pub struct Ade7953<I, D> {
    pub(crate) interface: I,
    pub(crate) calibration: Calibration,
    pub(crate) delay: D,
}

impl<I, D, E> Ade7953<I, D>
where
    I: Interface<Error = E>,
    D: DelayNs,
{
    /// Crea el dispositivo y ejecuta la secuencia de arranque completa.
    ///
    /// La sonda del registro de versión es fatal: si el chip no responde no
    /// se devuelve ningún dispositivo. El resto de escrituras de arranque
    /// son de mejor esfuerzo, como tolera el propio chip.
    pub fn new(interface: I, delay: D, config: &Ade7953Config) -> Result<Self, Ade7953Error> {
        let mut dev = Self {
            interface,
            calibration: Calibration {
                voltage_scale: config.voltage_scale,
                current_scale: config.current_scale,
                apower_scale: config.apower_scale,
                aenergy_scale: config.aenergy_scale,
            },
            delay,
        };
        dev.initialize(config)?;
        Ok(dev)
    }

    /// Consume el dispositivo y devuelve la interfaz y el delay subyacentes
    pub fn release(self) -> (I, D) {
        (self.interface, self.delay)
    }

    fn initialize(&mut self, config: &Ade7953Config) -> Result<(), Ade7953Error> {
        let version = match self.read_register(regs::VERSION, false) {
            Ok(version) => version,
            Err(_) => {
                log::error!("No hay comunicación con el ADE7953");
                return Err(Ade7953Error::ProbeFailed);
            }
        };
        log::info!("ADE7953 versión de silicio: {:#04x} ({})", version, version);

        // Reset por software. El chip se resetea de inmediato y no confirma
        // esta escritura, así que el resultado se descarta.
        let _ = self.write_register(regs::CONFIG, regs::CONFIG_SWRST);
        self.delay.delay_ms(RESET_POLL_INTERVAL_MS);
        let mut retries = RESET_POLL_RETRIES;
        loop {
            self.delay.delay_ms(RESET_POLL_INTERVAL_MS);
            if let Ok(status) = self.read_register(regs::IRQSTATA, false) {
                if status & regs::IRQSTATA_RESET != 0 {
                    break;
                }
            }
            retries -= 1;
            if retries == 0 {
                log::error!("El ADE7953 no señaló el final del reset");
                return Err(Ade7953Error::Timeout);
            }
        }

        // Bloquear la interfaz de comunicación y activar el filtro paso alto
        let _ = self.write_register(regs::CONFIG, CONFIG_LOCK_HPF);
        // Desbloqueo del registro sin nombre 0x0FE y ajuste óptimo de 0x120
        let _ = self.write_register(regs::UNLOCK, UNLOCK_MAGIC);
        let _ = self.write_register(regs::RESERVED, RESERVED_OPTIMUM);

        // Programar los offsets de medida, convertidos de unidades físicas a
        // cuentas del ADC con la escala de cada canal
        if config.voltage_offset != 0.0 && config.voltage_scale != 0.0 {
            let _ = self.write_register(
                regs::VRMSOS,
                (config.voltage_offset / config.voltage_scale) as i32,
            );
        }
        if config.current_offset[0] != 0.0 && config.current_scale[0] != 0.0 {
            let _ = self.write_register(
                regs::AIRMSOS,
                (config.current_offset[0] / config.current_scale[0]) as i32,
            );
        }
        if config.current_offset[1] != 0.0 && config.current_scale[1] != 0.0 {
            let _ = self.write_register(
                regs::BIRMSOS,
                (config.current_offset[1] / config.current_scale[1]) as i32,
            );
        }

        // Ganancias PGA
        if config.voltage_pga_gain != PgaGain::Gain1 {
            let _ = self.write_register(regs::PGA_V, config.voltage_pga_gain as i32);
        }
        if config.current_pga_gain[0] != PgaGain::Gain1 {
            let _ = self.write_register(regs::PGA_IA, config.current_pga_gain[0] as i32);
        }
        if config.current_pga_gain[1] != PgaGain::Gain1 {
            let _ = self.write_register(regs::PGA_IB, config.current_pga_gain[1] as i32);
        }

        // Acumulación de energía por ciclos de línea
        let _ = self.write_register(regs::LCYCMODE, LCYCMODE_DEFAULT);

        Ok(())
    }

    /// Lee un registro y devuelve su valor de 32 bits.
    ///
    /// La anchura se deriva de la dirección; `signed` aplica la máscara de
    /// signo propia del chip.
    pub fn read_register(&mut self, reg: u16, signed: bool) -> Result<i32, Ade7953Error> {
        let size = register::register_size(reg);
        if !(1..=4).contains(&size) {
            return Err(Ade7953Error::InvalidParameter);
        }

        let mut data = [0u8; 4];
        if let Err(e) = self.interface.read_reg(reg, &mut data[..size]) {
            log::error!("Error de lectura de registro del ADE7953 ({:#x})", reg);
            return Err(Ade7953Error::from_error(e));
        }

        Ok(register::decode_value(&data[..size], signed))
    }

    /// Escribe un registro con la anchura que dicta su dirección
    pub fn write_register(&mut self, reg: u16, value: i32) -> Result<(), Ade7953Error> {
        let size = register::register_size(reg);
        if !(1..=4).contains(&size) {
            return Err(Ade7953Error::InvalidParameter);
        }

        let mut buf = [0u8; 4];
        let data = register::encode_value(value, size, &mut buf);
        if let Err(e) = self.interface.write_reg(reg, data) {
            // La escritura de CONFIG.SWRST no recibe ack: el chip se resetea
            // antes de responder
            if !(reg == regs::CONFIG && value & regs::CONFIG_SWRST != 0) {
                log::error!("Error de escritura de registro del ADE7953 ({:#x})", reg);
            }
            return Err(Ade7953Error::from_error(e));
        }
        Ok(())
    }

    /// Tensión RMS de línea, en voltios
    pub fn get_voltage(&mut self) -> Result<f32, Ade7953Error> {
        let raw = self.read_register(regs::V, false)?;
        Ok(conversion::voltage_raw_to_volts(
            raw,
            self.calibration.voltage_scale,
        ))
    }

    /// Frecuencia de línea, en hercios
    pub fn get_frequency(&mut self) -> Result<f32, Ade7953Error> {
        let raw = self.read_register(regs::PERIOD, false)?;
        Ok(conversion::period_raw_to_hertz(raw))
    }

    /// Corriente RMS del canal (0 o 1), en amperios
    pub fn get_current(&mut self, channel: u8) -> Result<f32, Ade7953Error> {
        let reg = match channel {
            0 => regs::IA,
            1 => regs::IB,
            _ => return Err(Ade7953Error::InvalidParameter),
        };
        let raw = self.read_register(reg, true)?;
        Ok(conversion::current_raw_to_amperes(
            raw,
            self.calibration.current_scale[channel as usize],
        ))
    }

    /// Potencia activa instantánea del canal (0 o 1), en vatios
    pub fn get_active_power(&mut self, channel: u8) -> Result<f32, Ade7953Error> {
        let reg = match channel {
            0 => regs::AWATT,
            1 => regs::BWATT,
            _ => return Err(Ade7953Error::InvalidParameter),
        };
        let raw = self.read_register(reg, true)?;
        Ok(conversion::power_raw_to_watts(
            raw,
            self.calibration.apower_scale[channel as usize],
        ))
    }

    /// Energía activa acumulada del canal (0 o 1), en vatios-hora.
    ///
    /// `reset` pide que la lectura ponga a cero el acumulador. El bit
    /// RSTREAD de LCYCMODE es un modo compartido del chip, no un parámetro
    /// por lectura, así que se comprueba y reescribe antes de leer si no
    /// coincide con lo pedido.
    pub fn get_active_energy(&mut self, channel: u8, reset: bool) -> Result<f32, Ade7953Error> {
        let reg = match channel {
            0 => regs::AENERGYA,
            1 => regs::AENERGYB,
            _ => return Err(Ade7953Error::InvalidParameter),
        };

        let mut mode = self.read_register(regs::LCYCMODE, false)?;
        if (mode & regs::LCYCMODE_RSTREAD != 0) != reset {
            if reset {
                mode |= regs::LCYCMODE_RSTREAD;
            } else {
                mode &= !regs::LCYCMODE_RSTREAD;
            }
            self.write_register(regs::LCYCMODE, mode)?;
        }

        let raw = self.read_register(reg, true)?;
        Ok(conversion::energy_raw_to_watt_hours(
            raw,
            self.calibration.aenergy_scale[channel as usize],
        ))
    }

    /// Factor de potencia del canal (0 o 1), adimensional en [-1, 1]
    pub fn get_power_factor(&mut self, channel: u8) -> Result<f32, Ade7953Error> {
        let reg = match channel {
            0 => regs::PFA,
            1 => regs::PFB,
            _ => return Err(Ade7953Error::InvalidParameter),
        };
        let raw = self.read_register(reg, false)?;
        Ok(conversion::pf_raw_to_factor(raw))
    }

    /// Cambia la escala del canal de tensión
    pub fn set_voltage_scale(&mut self, scale: f32) -> Result<(), Ade7953Error> {
        if scale == 0.0 {
            return Err(Ade7953Error::InvalidParameter);
        }
        self.calibration.voltage_scale = scale;
        Ok(())
    }

    /// Cambia la escala de corriente del canal (0 o 1)
    pub fn set_current_scale(&mut self, channel: u8, scale: f32) -> Result<(), Ade7953Error> {
        if channel > 1 || scale == 0.0 {
            return Err(Ade7953Error::InvalidParameter);
        }
        self.calibration.current_scale[channel as usize] = scale;
        Ok(())
    }

    /// Cambia la escala de potencia activa del canal (0 o 1)
    pub fn set_apower_scale(&mut self, channel: u8, scale: f32) -> Result<(), Ade7953Error> {
        if channel > 1 || scale == 0.0 {
            return Err(Ade7953Error::InvalidParameter);
        }
        self.calibration.apower_scale[channel as usize] = scale;
        Ok(())
    }

    /// Cambia la escala de energía activa del canal (0 o 1)
    pub fn set_aenergy_scale(&mut self, channel: u8, scale: f32) -> Result<(), Ade7953Error> {
        if channel > 1 || scale == 0.0 {
            return Err(Ade7953Error::InvalidParameter);
        }
        self.calibration.aenergy_scale[channel as usize] = scale;
        Ok(())
    }

    /// Reprograma el offset del canal de tensión, en voltios
    pub fn set_voltage_offset(&mut self, volts: f32) -> Result<(), Ade7953Error> {
        if self.calibration.voltage_scale == 0.0 {
            return Err(Ade7953Error::InvalidParameter);
        }
        let counts = (volts / self.calibration.voltage_scale) as i32;
        self.write_register(regs::VRMSOS, counts)
    }

    /// Reprograma el offset de corriente del canal (0 o 1), en amperios
    pub fn set_current_offset(&mut self, channel: u8, amperes: f32) -> Result<(), Ade7953Error> {
        let reg = match channel {
            0 => regs::AIRMSOS,
            1 => regs::BIRMSOS,
            _ => return Err(Ade7953Error::InvalidParameter),
        };
        let scale = self.calibration.current_scale[channel as usize];
        if scale == 0.0 {
            return Err(Ade7953Error::InvalidParameter);
        }
        self.write_register(reg, (amperes / scale) as i32)
    }
}
