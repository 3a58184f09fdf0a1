//! Shared primitives: timestamps, calendar dates, roles and priorities
use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc};

#[derive(Debug, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl<T: TimeZone> PartialEq for TimeStamp<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T: TimeZone> Eq for TimeStamp<T> {}

impl<T: TimeZone> PartialOrd for TimeStamp<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: TimeZone> Ord for TimeStamp<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .unwrap()
            .into()
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
    /// Calendar date of this instant in UTC.
    pub fn date_utc(&self) -> DateStamp {
        DateStamp(self.0.date_naive())
    }
    /// Whole hours elapsed between `earlier` and this instant.
    pub fn hours_since(&self, earlier: &TimeStamp<Utc>) -> i64 {
        (self.0 - earlier.0).num_hours()
    }
    pub fn minus_days(&self, days: u64) -> Self {
        Self(self.0 - chrono::Duration::days(days as i64))
    }
    pub fn minus_hours(&self, hours: u64) -> Self {
        Self(self.0 - chrono::Duration::hours(hours as i64))
    }
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }
}

impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// A plain calendar date. Contract start/end dates carry no time component;
/// all scheduler date math runs on this type.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub struct DateStamp(NaiveDate);

impl DateStamp {
    pub fn new_with(year: i32, month: u32, day: u32) -> Self {
        Self(NaiveDate::from_ymd_opt(year, month, day).unwrap())
    }
    pub fn today() -> Self {
        Self(Utc::now().date_naive())
    }
    /// Signed day count from `self` until `other`; negative when `other` is past.
    pub fn days_until(&self, other: &DateStamp) -> i64 {
        (other.0 - self.0).num_days()
    }
    pub fn plus_days(&self, days: u64) -> Self {
        Self(self.0 + Days::new(days))
    }
    pub fn minus_days(&self, days: u64) -> Self {
        Self(self.0 - Days::new(days))
    }
}

impl<C> minicbor::Encode<C> for DateStamp {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.i32(self.0.num_days_from_ce())?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for DateStamp {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let days = d.i32()?;

        NaiveDate::from_num_days_from_ce_opt(days)
            .map(DateStamp)
            .ok_or(minicbor::decode::Error::message(
                "failed to convert day count to a calendar date",
            ))
    }
}

/// Roles handed to us by the external identity provider. The core trusts
/// the role as already authenticated.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    #[n(0)]
    User,
    #[n(1)]
    Gestor,
    #[n(2)]
    Supervisor,
    #[n(3)]
    Admin,
}

/// Capabilities checked by operation guards. Guards take these as data so the
/// authorization matrix lives in one place, not per call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ManageContracts,
    Review,
    AdminOverride,
}

impl Role {
    pub fn has(&self, cap: Capability) -> bool {
        match cap {
            Capability::ManageContracts => {
                matches!(self, Role::Gestor | Role::Supervisor | Role::Admin)
            }
            Capability::Review => matches!(self, Role::Supervisor | Role::Admin),
            Capability::AdminOverride => matches!(self, Role::Admin),
        }
    }
}

/// The authenticated caller of an interactive operation.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: String,
    pub name: String,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            role,
        }
    }
    pub fn has(&self, cap: Capability) -> bool {
        self.role.has(cap)
    }
}

#[derive(
    minicbor::Encode,
    minicbor::Decode,
    serde::Serialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[n(0)]
    Low,
    #[n(1)]
    Medium,
    #[n(2)]
    High,
    #[n(3)]
    Urgent,
}

impl Priority {
    /// Ladder used by expiry notifications: urgent at <=1 day, high at <=5,
    /// medium at <=10, low beyond.
    pub fn for_days_until_expiry(days: i64) -> Self {
        if days <= 1 {
            Priority::Urgent
        } else if days <= 5 {
            Priority::High
        } else if days <= 10 {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_encoding() {
        let original = TimeStamp::new();

        let encoding = minicbor::to_vec(&original).unwrap();
        let decode: TimeStamp<Utc> = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
    }

    #[test]
    fn datestamp_encoding() {
        let original = DateStamp::new_with(2026, 8, 25);

        let encoding = minicbor::to_vec(&original).unwrap();
        let decode: DateStamp = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
    }

    #[test]
    fn days_until_is_signed() {
        let today = DateStamp::new_with(2026, 8, 25);
        assert_eq!(today.days_until(&today.plus_days(10)), 10);
        assert_eq!(today.days_until(&today.minus_days(1)), -1);
    }

    #[test]
    fn priority_ladder() {
        assert_eq!(Priority::for_days_until_expiry(1), Priority::Urgent);
        assert_eq!(Priority::for_days_until_expiry(5), Priority::High);
        assert_eq!(Priority::for_days_until_expiry(10), Priority::Medium);
        assert_eq!(Priority::for_days_until_expiry(30), Priority::Low);
    }

    #[test]
    fn capability_matrix() {
        assert!(Role::Admin.has(Capability::AdminOverride));
        assert!(Role::Supervisor.has(Capability::Review));
        assert!(!Role::Supervisor.has(Capability::AdminOverride));
        assert!(Role::Gestor.has(Capability::ManageContracts));
        assert!(!Role::Gestor.has(Capability::Review));
        assert!(!Role::User.has(Capability::ManageContracts));
    }
}
