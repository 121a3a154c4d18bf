//! Configuración de calibración del ADE7953
//!
//! Los factores de escala dependen del divisor de tensión y del shunt que
//! acompañan al chip en cada placa, así que se entregan al crear el
//! dispositivo y no llevan valores de fábrica útiles.

/// Ganancias seleccionables del amplificador de entrada (PGA)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PgaGain {
    /// Ganancia 1x
    #[default]
    Gain1 = 0x00,
    /// Ganancia 2x
    Gain2 = 0x01,
    /// Ganancia 4x
    Gain4 = 0x02,
    /// Ganancia 8x
    Gain8 = 0x03,
    /// Ganancia 16x
    Gain16 = 0x04,
    /// Ganancia 22x (solo canal de corriente A)
    Gain22 = 0x05,
}

/// Configuración de calibración entregada al crear el dispositivo
#[derive(Debug, Clone)]
pub struct Ade7953Config {
    /// Factor de conversión de cuentas del canal de tensión a voltios.
    /// Depende del divisor de tensión de la entrada.
    pub voltage_scale: f32,
    /// Desplazamiento de la medida de tensión, en voltios
    pub voltage_offset: f32,

    /// Factores de conversión de cuentas de corriente a amperios.
    /// Dependen de los parámetros del shunt.
    pub current_scale: [f32; 2],
    /// Desplazamientos de la medida de corriente, en amperios
    pub current_offset: [f32; 2],

    /// Factores de conversión de potencia activa a vatios
    pub apower_scale: [f32; 2],

    /// Factores de conversión de energía activa a vatios-hora
    pub aenergy_scale: [f32; 2],

    /// Ganancia PGA del canal de tensión
    pub voltage_pga_gain: PgaGain,
    /// Ganancia PGA de cada canal de corriente
    pub current_pga_gain: [PgaGain; 2],
}

impl Default for Ade7953Config {
    fn default() -> Self {
        Self {
            voltage_scale: 1.0,
            voltage_offset: 0.0,
            current_scale: [1.0, 1.0],
            current_offset: [0.0, 0.0],
            apower_scale: [1.0, 1.0],
            aenergy_scale: [1.0, 1.0],
            voltage_pga_gain: PgaGain::default(),
            current_pga_gain: [PgaGain::default(), PgaGain::default()],
        }
    }
}
