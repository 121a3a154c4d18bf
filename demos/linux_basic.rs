use ade7953_rs::{Ade7953, Ade7953Config, I2cInterface, DEFAULT_I2C_ADDR};
use linux_embedded_hal::{Delay, I2cdev};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;
use std::time::Duration;

fn main() {
    println!("ADE7953 - Ejemplo básico");

    // Flag para controlar la ejecución del programa
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    // Configurar el manejador para Ctrl+C
    ctrlc::set_handler(move || {
        println!("\nDeteniendo el programa...");
        r.store(false, Ordering::SeqCst);
    })
    .expect("Error al configurar el manejador de Ctrl+C");

    // Crear instancia de I2C para Linux
    let i2c = match I2cdev::new("/dev/i2c-0") {
        Ok(i2c) => i2c,
        Err(e) => {
            eprintln!("Error al abrir dispositivo I2C: {:?}", e);
            return;
        }
    };

    // Escalas de la placa Shelly 2.5 como ejemplo de calibración
    let config = Ade7953Config {
        voltage_scale: 1.0 / 26000.0,
        current_scale: [1.0 / 100000.0, 1.0 / 100000.0],
        apower_scale: [1.0 / 3054.0, 1.0 / 3054.0],
        aenergy_scale: [1.0 / 85.0, 1.0 / 85.0],
        ..Default::default()
    };

    // Crear el dispositivo; la creación ejecuta la secuencia de arranque
    let interface = I2cInterface::new(i2c, DEFAULT_I2C_ADDR, Delay {});
    let mut device = match Ade7953::new(interface, Delay {}, &config) {
        Ok(device) => device,
        Err(e) => {
            eprintln!("Error al inicializar el dispositivo: {:?}", e);
            return;
        }
    };
    println!("Dispositivo inicializado correctamente");

    while running.load(Ordering::SeqCst) {
        match device.get_voltage() {
            Ok(volts) => print!("V: {:.1} V", volts),
            Err(e) => eprintln!("Error al leer tensión: {:?}", e),
        }
        if let Ok(hertz) = device.get_frequency() {
            print!("  f: {:.2} Hz", hertz);
        }
        for channel in 0..2u8 {
            if let Ok(amperes) = device.get_current(channel) {
                print!("  I{}: {:.3} A", channel, amperes);
            }
            if let Ok(watts) = device.get_active_power(channel) {
                print!("  P{}: {:.1} W", channel, watts);
            }
            if let Ok(wh) = device.get_active_energy(channel, false) {
                print!("  E{}: {:.2} Wh", channel, wh);
            }
            if let Ok(pf) = device.get_power_factor(channel) {
                print!("  PF{}: {:.3}", channel, pf);
            }
        }
        println!();

        thread::sleep(Duration::from_secs(1));
    }
}
