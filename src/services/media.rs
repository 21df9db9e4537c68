// src/services/media.rs

use crate::models::{car::{Car, CarView}, subscription::Subscription};

/// Monta URLs públicas de fotos de carro e logos de marca.
#[derive(Debug, Clone)]
pub struct PublicUrls {
    base: String,
}

impl PublicUrls {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self { base: base.trim_end_matches('/').to_string() }
    }

    /// Valores absolutos (http, https, data:) passam direto.
    pub fn car_photo(&self, photo: Option<&str>) -> Option<String> {
        let photo = photo.filter(|p| !p.is_empty())?;
        if is_absolute(photo) {
            return Some(photo.to_string());
        }
        Some(format!("{}/public/car-photos/{}", self.base, photo))
    }

    pub fn brand_logo(&self, file: Option<&str>) -> Option<String> {
        file.filter(|f| !f.is_empty())
            .map(|f| format!("{}/public/brand-logos/{}", self.base, f))
    }

    pub fn car_view(&self, car: Car, subscription: Option<Subscription>) -> CarView {
        let photo_url = self.car_photo(car.photo.as_deref());
        CarView { car, photo_url, subscription }
    }
}

fn is_absolute(value: &str) -> bool {
    value.starts_with("data:") || value.starts_with("http://") || value.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_photos_are_served_from_public_dir() {
        let urls = PublicUrls::new("http://localhost:5000/");
        assert_eq!(
            urls.car_photo(Some("abc.jpg")).as_deref(),
            Some("http://localhost:5000/public/car-photos/abc.jpg")
        );
        assert_eq!(urls.car_photo(None), None);
        assert_eq!(urls.car_photo(Some("")), None);
    }

    #[test]
    fn absolute_photos_pass_through() {
        let urls = PublicUrls::new("http://localhost:5000");
        assert_eq!(
            urls.car_photo(Some("https://cdn.example.com/a.png")).as_deref(),
            Some("https://cdn.example.com/a.png")
        );
        assert_eq!(
            urls.car_photo(Some("data:image/png;base64,AAAA")).as_deref(),
            Some("data:image/png;base64,AAAA")
        );
    }

    #[test]
    fn brand_logos_resolve_or_stay_empty() {
        let urls = PublicUrls::new("https://api.cleanride.ae");
        assert_eq!(
            urls.brand_logo(Some("bmw.svg")).as_deref(),
            Some("https://api.cleanride.ae/public/brand-logos/bmw.svg")
        );
        assert_eq!(urls.brand_logo(None), None);
    }
}
