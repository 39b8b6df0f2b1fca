use linux_embedded_hal::{Delay, I2cdev};
use pm2x05::{Config, Pm2x05, Sink, Variant};
use std::time::{Duration, Instant};

struct Stdout(&'static str);

impl Sink for Stdout {
    fn publish(&mut self, ug_per_m3: u16) {
        println!("{}: {} µg/m³", self.0, ug_per_m3);
    }
}

fn main() {
    let path = std::env::args()
        .skip(1)
        .next()
        .expect("Missing path to i2c device");

    println!("Connecting to: {}", path);

    let device = I2cdev::new(&path).unwrap();
    let mut pm1_0 = Stdout("PM1.0");
    let mut pm2_5 = Stdout("PM2.5");
    let mut sensor = Pm2x05::new(device, Config::new(Variant::Pm2005)).unwrap();
    sensor.set_pm1_0_sink(&mut pm1_0);
    sensor.set_pm2_5_sink(&mut pm2_5);

    let started = Instant::now();
    let mut delay = Delay;
    loop {
        let now_ms = started.elapsed().as_millis() as u32;
        if let Err(e) = sensor.tick(now_ms, &mut delay) {
            println!("{}", e);
        }
        std::thread::sleep(Duration::from_secs(1));
    }
}
