/// Uniform access to SDK string fields.
///
/// Generated getters return `&str` for required members and
/// `Option<&str>` for optional ones; both read the same through `value()`,
/// with empty strings treated as absent.
pub(crate) trait Field<'a> {
    fn value(self) -> Option<&'a str>;
}

impl<'a> Field<'a> for &'a str {
    fn value(self) -> Option<&'a str> {
        Some(self).filter(|s| !s.is_empty())
    }
}

impl<'a> Field<'a> for Option<&'a str> {
    fn value(self) -> Option<&'a str> {
        self.filter(|s| !s.is_empty())
    }
}

/// Last path segment of an ARN, e.g. the phone number id of
/// `arn:aws:connect:us-east-1:123456789012:phone-number/abc`.
pub(crate) fn arn_resource_id(arn: &str) -> &str {
    arn.rsplit('/').next().unwrap_or(arn)
}
