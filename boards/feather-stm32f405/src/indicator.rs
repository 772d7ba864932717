#![deny(unsafe_code)]
#![deny(warnings)]
//! Red status LED (PC1)

use embassy_stm32::gpio::Output;
use hal_abstractions::StatusIndicator;

pub struct StatusLed<'a> {
    led: &'a mut Output<'static>,
}

impl<'a> StatusLed<'a> {
    pub fn new(led: &'a mut Output<'static>) -> Self {
        Self { led }
    }
}

impl StatusIndicator for StatusLed<'_> {
    fn set_lit(&mut self, lit: bool) {
        if lit {
            self.led.set_high();
        } else {
            self.led.set_low();
        }
    }
}
