//! DS3231 real-time clock driver
//!
//! Register-level access to the timekeeping registers, alarm 1 and the
//! control/status flags. The chip holds UTC in 24-hour mode. The driver
//! never retries; a failed transfer is reported to the caller.
//!
//! Register map (datasheet, "Timekeeping Registers"):
//! - `0x00..=0x06`: seconds, minutes, hours, weekday, date, month/century, year
//! - `0x07..=0x0A`: alarm 1 seconds, minutes, hours, day/date
//! - `0x0E`: control
//! - `0x0F`: status

pub mod bcd;

use embedded_hal_async::i2c::{Error as _, I2c};

use self::bcd::{bcd_to_dec, dec_to_bcd};
use crate::alarm::AlarmSpec;
use crate::datetime::WallClock;
use crate::error::RtcError;

/// Fixed I2C address of the DS3231
pub const DS3231_ADDRESS: u8 = 0x68;

pub(crate) mod registers {
    pub const TIME: u8 = 0x00;
    pub const ALARM1: u8 = 0x07;
    pub const CONTROL: u8 = 0x0E;
    pub const STATUS: u8 = 0x0F;
}

/// Control register bits
pub(crate) mod control {
    /// Alarm 1 interrupt enable
    pub const A1IE: u8 = 1 << 0;
    /// Alarm 2 interrupt enable
    pub const A2IE: u8 = 1 << 1;
    /// INT/SQW pin signals alarms instead of the square wave
    pub const INTCN: u8 = 1 << 2;
}

/// Status register bits
pub(crate) mod status {
    /// Alarm 1 matched
    pub const A1F: u8 = 1 << 0;
}

/// Years representable without the century bit
const YEAR_BASE: u16 = 2000;

/// DS3231 on an async I2C bus
pub struct Ds3231<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Ds3231<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, DS3231_ADDRESS)
    }

    /// Driver for a module strapped to a non-default address
    pub fn with_address(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Give the bus back
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Read the current UTC time
    pub async fn read_time(&mut self) -> Result<WallClock, RtcError> {
        let mut regs = [0u8; 7];
        self.read(registers::TIME, &mut regs).await?;

        let time = WallClock {
            second: bcd_to_dec(regs[0] & 0x7F),
            minute: bcd_to_dec(regs[1] & 0x7F),
            // Bits 6 and 5 select 12-hour mode; we only write 24-hour mode
            hour: bcd_to_dec(regs[2] & 0x3F),
            weekday: regs[3] & 0x07,
            day: bcd_to_dec(regs[4] & 0x3F),
            // Bit 7 is the century flag
            month: bcd_to_dec(regs[5] & 0x1F),
            year: YEAR_BASE + bcd_to_dec(regs[6]) as u16,
        };

        if !time.is_valid() || time.year >= YEAR_BASE + 100 {
            warn!("RTC registers hold an invalid time: {:x}", regs);
            return Err(RtcError::InvalidData);
        }
        Ok(time)
    }

    /// Set the clock to `time` (UTC, year 2000..=2099)
    pub async fn write_time(&mut self, time: &WallClock) -> Result<(), RtcError> {
        if !time.is_valid() || !(YEAR_BASE..YEAR_BASE + 100).contains(&time.year) {
            return Err(RtcError::OutOfRange);
        }

        let year = (time.year - YEAR_BASE) as u8;
        self.write(&[
            registers::TIME,
            dec_to_bcd(time.second),
            dec_to_bcd(time.minute),
            dec_to_bcd(time.hour),
            time.weekday,
            dec_to_bcd(time.day),
            dec_to_bcd(time.month),
            dec_to_bcd(year),
        ])
        .await
    }

    /// Program alarm 1 to match `spec` and route it to the INT pin
    ///
    /// The alarm matches date, hours, minutes and seconds. Alarm 2
    /// interrupts are disabled.
    pub async fn arm_alarm(&mut self, spec: AlarmSpec) -> Result<(), RtcError> {
        if !spec.is_valid() {
            return Err(RtcError::OutOfRange);
        }

        // A1M1..A1M4 and DY/DT all clear: match on date
        self.write(&[
            registers::ALARM1,
            dec_to_bcd(spec.second),
            dec_to_bcd(spec.minute),
            dec_to_bcd(spec.hour),
            dec_to_bcd(spec.day),
        ])
        .await?;

        let ctrl = self.read_register(registers::CONTROL).await?;
        let ctrl = (ctrl | control::INTCN | control::A1IE) & !control::A2IE;
        self.write(&[registers::CONTROL, ctrl]).await
    }

    /// Acknowledge a fired alarm 1, releasing the INT pin
    pub async fn clear_alarm_flag(&mut self) -> Result<(), RtcError> {
        let stat = self.read_register(registers::STATUS).await?;
        self.write(&[registers::STATUS, stat & !status::A1F]).await
    }

    /// Whether alarm 1 has fired since the flag was last cleared
    pub async fn alarm_fired(&mut self) -> Result<bool, RtcError> {
        let stat = self.read_register(registers::STATUS).await?;
        Ok(stat & status::A1F != 0)
    }

    async fn read_register(&mut self, register: u8) -> Result<u8, RtcError> {
        let mut value = [0u8; 1];
        self.read(register, &mut value).await?;
        Ok(value[0])
    }

    async fn read(&mut self, register: u8, buf: &mut [u8]) -> Result<(), RtcError> {
        self.i2c
            .write_read(self.address, &[register], buf)
            .await
            .map_err(|e| RtcError::Bus(e.kind()))
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), RtcError> {
        self.i2c
            .write(self.address, bytes)
            .await
            .map_err(|e| RtcError::Bus(e.kind()))
    }
}

#[cfg(test)]
mod tests {
    use embassy_futures::block_on;
    use embedded_hal::i2c::ErrorKind;

    use super::*;
    use crate::testing::FakeDs3231;

    fn wall_clock(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> WallClock {
        let mut time = WallClock {
            year,
            month,
            day,
            weekday: 1,
            hour,
            minute,
            second,
        };
        time.weekday = WallClock::from_instant(time.to_instant()).weekday;
        time
    }

    #[test]
    fn test_write_then_read_time() {
        let chip = FakeDs3231::new();
        let mut rtc = Ds3231::new(chip.clone());
        let time = wall_clock(2030, 1, 1, 9, 0, 0);

        block_on(rtc.write_time(&time)).unwrap();
        assert_eq!(
            chip.registers()[0..7],
            [0x00, 0x00, 0x09, 0x03, 0x01, 0x01, 0x30]
        );
        assert_eq!(block_on(rtc.read_time()), Ok(time));
    }

    #[test]
    fn test_read_masks_mode_and_century_bits() {
        let chip = FakeDs3231::new();
        chip.load(registers::TIME, &[0x59, 0x59, 0x23, 0x07, 0x31, 0x80 | 0x12, 0x99]);
        let mut rtc = Ds3231::new(chip);
        let time = block_on(rtc.read_time()).unwrap();
        assert_eq!(time, WallClock {
            year: 2099,
            month: 12,
            day: 31,
            weekday: 7,
            hour: 23,
            minute: 59,
            second: 59,
        });
    }

    #[test]
    fn test_invalid_registers_are_rejected() {
        let chip = FakeDs3231::new();
        // Month 0x13 and day 0x00 cannot occur on a running clock
        chip.load(registers::TIME, &[0x00, 0x00, 0x00, 0x01, 0x00, 0x13, 0x25]);
        let mut rtc = Ds3231::new(chip);
        assert_eq!(block_on(rtc.read_time()), Err(RtcError::InvalidData));
    }

    #[test]
    fn test_write_rejects_unrepresentable_years() {
        let mut rtc = Ds3231::new(FakeDs3231::new());
        let time = wall_clock(2100, 1, 1, 0, 0, 0);
        assert_eq!(block_on(rtc.write_time(&time)), Err(RtcError::OutOfRange));
        let time = wall_clock(1999, 12, 31, 0, 0, 0);
        assert_eq!(block_on(rtc.write_time(&time)), Err(RtcError::OutOfRange));
    }

    #[test]
    fn test_arm_alarm_programs_alarm1_and_control() {
        let chip = FakeDs3231::new();
        // EOSC clear, alarm 2 enabled, square wave mode
        chip.load(registers::CONTROL, &[control::A2IE]);
        let mut rtc = Ds3231::new(chip.clone());

        let spec = AlarmSpec {
            second: 30,
            minute: 45,
            hour: 17,
            day: 28,
        };
        block_on(rtc.arm_alarm(spec)).unwrap();

        let regs = chip.registers();
        assert_eq!(regs[0x07..=0x0A], [0x30, 0x45, 0x17, 0x28]);
        assert_eq!(regs[registers::CONTROL as usize], control::INTCN | control::A1IE);
    }

    #[test]
    fn test_clear_alarm_flag_keeps_other_status_bits() {
        let chip = FakeDs3231::new();
        chip.load(registers::STATUS, &[0x80 | 0x02 | status::A1F]);
        let mut rtc = Ds3231::new(chip.clone());

        assert_eq!(block_on(rtc.alarm_fired()), Ok(true));
        block_on(rtc.clear_alarm_flag()).unwrap();
        assert_eq!(chip.registers()[registers::STATUS as usize], 0x82);
        assert_eq!(block_on(rtc.alarm_fired()), Ok(false));
    }

    #[test]
    fn test_bus_errors_carry_kind() {
        let chip = FakeDs3231::new();
        chip.set_failing(true);
        let mut rtc = Ds3231::new(chip);
        assert_eq!(
            block_on(rtc.read_time()),
            Err(RtcError::Bus(ErrorKind::NoAcknowledge(
                embedded_hal::i2c::NoAcknowledgeSource::Address
            )))
        );
    }

    #[test]
    fn test_custom_address_and_release() {
        let mut rtc = Ds3231::with_address(FakeDs3231::new(), 0x57);
        block_on(rtc.clear_alarm_flag()).unwrap();
        let chip = rtc.release();
        assert_eq!(chip.last_address(), Some(0x57));
    }
}
