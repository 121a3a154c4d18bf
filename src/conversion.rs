//! Funciones de conversión para las medidas del ADE7953
//!
//! Este módulo convierte los valores raw de los registros del chip a
//! unidades físicas: voltios, amperios, vatios, vatios-hora, hercios y
//! factor de potencia.

/// Convierte cuentas del canal de tensión a voltios RMS
///
/// # Arguments
/// * `raw` - Valor raw del registro V
/// * `scale` - Factor de calibración del canal de tensión
#[inline]
pub fn voltage_raw_to_volts(raw: i32, scale: f32) -> f32 {
    raw as f32 * scale
}

/// Convierte cuentas de un canal de corriente a amperios RMS
#[inline]
pub fn current_raw_to_amperes(raw: i32, scale: f32) -> f32 {
    raw as f32 * scale
}

/// Convierte cuentas de potencia activa a vatios
#[inline]
pub fn power_raw_to_watts(raw: i32, scale: f32) -> f32 {
    raw as f32 * scale
}

/// Convierte cuentas del acumulador de energía activa a vatios-hora
#[inline]
pub fn energy_raw_to_watt_hours(raw: i32, scale: f32) -> f32 {
    raw as f32 * scale
}

/// Convierte el registro PERIOD a la frecuencia de línea en hercios
///
/// El contador de periodo corre a 223.75 kHz, derivado del reloj interno del
/// chip (datasheet, sección PERIOD).
#[inline]
pub fn period_raw_to_hertz(raw: i32) -> f32 {
    223750.0 / (raw as f32 + 1.0)
}

/// Convierte el registro de factor de potencia a su valor adimensional
///
/// El bit 15 indica el signo y forma parte del cálculo: con el bit a uno el
/// resultado es -(32767/raw); con el bit a cero, raw * 0.000030518. La
/// asimetría es la convención documentada del chip.
#[inline]
pub fn pf_raw_to_factor(raw: i32) -> f32 {
    if raw & (1 << 15) != 0 {
        -(32767.0 / raw as f32)
    } else {
        raw as f32 * 0.000030518
    }
}
