pub mod soap;
pub mod xml_daily;

pub use soap::SoapRateSource;
pub use xml_daily::XmlDailyRateSource;
