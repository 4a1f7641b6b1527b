//! Codec implementations for time types.
//!
//! Wall-clock times are carried as a duration since the Unix epoch:
//! 64-bit seconds followed by 32-bit nanoseconds.

use crate::{Decode, Encode, Error, Reader};
use reef_buffer::BufferList;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

impl Encode for Duration {
    fn write(&self, buf: &mut BufferList) {
        self.as_secs().write(buf);
        self.subsec_nanos().write(buf);
    }
}

impl Decode for Duration {
    fn read(reader: &mut Reader<'_>) -> Result<Self, Error> {
        let secs = u64::read(reader)?;
        let nanos = u32::read(reader)?;
        if nanos >= 1_000_000_000 {
            return Err(Error::Invalid("Duration", "nanoseconds out of range"));
        }
        Ok(Duration::new(secs, nanos))
    }
}

impl Encode for SystemTime {
    fn write(&self, buf: &mut BufferList) {
        let since_epoch = self
            .duration_since(UNIX_EPOCH)
            .expect("time before Unix epoch");
        since_epoch.write(buf);
    }
}

impl Decode for SystemTime {
    fn read(reader: &mut Reader<'_>) -> Result<Self, Error> {
        let since_epoch = Duration::read(reader)?;
        Ok(UNIX_EPOCH + since_epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration() {
        for value in [
            Duration::ZERO,
            Duration::from_millis(1_500),
            Duration::new(u32::MAX as u64, 999_999_999),
        ] {
            assert_eq!(Duration::decode(&value.encode()).unwrap(), value);
        }
    }

    #[test]
    fn test_duration_invalid_nanos() {
        let mut bl = BufferList::new();
        0u64.write(&mut bl);
        1_000_000_000u32.write(&mut bl);
        assert!(matches!(
            Duration::decode(&bl),
            Err(Error::Invalid("Duration", _))
        ));
    }

    #[test]
    fn test_system_time() {
        let value = UNIX_EPOCH + Duration::new(1_234_567_890, 42);
        let encoded = value.encode();
        assert_eq!(encoded.length(), 12);
        assert_eq!(SystemTime::decode(&encoded).unwrap(), value);
    }
}
