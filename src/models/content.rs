use crate::validation::content::{PHONE_RE, social_url};
use garde::Validate;
use serde::{Deserialize, Serialize};

/// Opening hours as displayed on the contact and footer blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct WorkingHours {
    /// Monday-to-Friday hours line.
    #[garde(length(min = 1, max = 50))]
    pub weekdays: String,
    /// Saturday hours line.
    #[garde(length(min = 1, max = 50))]
    pub saturday: String,
}

/// Social profile links. Either empty or absolute http(s) URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SocialMedia {
    #[garde(custom(social_url))]
    pub instagram: String,
    #[garde(custom(social_url))]
    pub facebook: String,
}

/// The editable site-content record.
///
/// Persisted as a whole-record JSON snapshot under the `arantesSiteConfig`
/// store key, camelCase field names for compatibility with what the browser
/// shell writes. Every field falls back to the baked-in default when absent
/// or unusable, so the record is always renderable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SiteContent {
    /// Landline in `(DD) DDDD-DDDD` display form.
    #[garde(pattern(PHONE_RE))]
    pub phone: String,
    /// WhatsApp number in `(DD) DDDDD-DDDD` display form.
    #[garde(pattern(PHONE_RE))]
    pub whatsapp: String,
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 10, max = 200))]
    pub address: String,
    #[garde(dive)]
    pub working_hours: WorkingHours,
    #[garde(dive)]
    pub social_media: SocialMedia,
    /// Home headline. The only field that may carry the restricted inline
    /// HTML subset; everything else is plain text.
    #[garde(length(min = 1, max = 200))]
    pub home_title: String,
    #[garde(length(min = 1, max = 200))]
    pub home_subtitle: String,
    #[garde(length(min = 10, max = 1000))]
    pub about_text: String,
    #[garde(length(min = 10, max = 500))]
    pub mission_text: String,
    /// Offered exams and services, in display order.
    #[garde(length(min = 1), inner(length(min = 1, max = 100)))]
    pub services: Vec<String>,
    /// Accepted insurance plans, in display order.
    #[garde(length(min = 1), inner(length(min = 1, max = 100)))]
    pub convenios: Vec<String>,
}

impl Default for SiteContent {
    fn default() -> Self {
        Self {
            phone: "(34) 3251-2055".to_string(),
            whatsapp: "(34) 93251-2055".to_string(),
            email: "contato@aranteslaboratorio.com.br".to_string(),
            address: "Avenida Joaquim Ribeiro de Gouveia, 1969 – Bairro Amoreiras, \
                      Santa Vitória – MG"
                .to_string(),
            working_hours: WorkingHours {
                weekdays: "Segunda a Sexta: 07h às 17h".to_string(),
                saturday: "Sábado: 07h às 11h".to_string(),
            },
            social_media: SocialMedia {
                instagram: "https://instagram.com/aranteslaboratorio".to_string(),
                facebook: "https://facebook.com/aranteslaboratorio".to_string(),
            },
            home_title: "Arantes Medicina Laboratorial\
                         <span class=\"text-primary-teal-600 block\">Tradição e Qualidade</span>"
                .to_string(),
            home_subtitle: "Excelência em análises clínicas com mais de 30 anos de tradição \
                            em Santa Vitória"
                .to_string(),
            about_text: "O Laboratório Arantes é referência em análises clínicas na região, \
                         oferecendo serviços de alta qualidade com equipamentos modernos e \
                         profissionais especializados."
                .to_string(),
            mission_text: "Nossa missão é fornecer resultados precisos e confiáveis para \
                           auxiliar no diagnóstico e tratamento de nossos pacientes."
                .to_string(),
            services: vec![
                "Análises Clínicas Gerais".to_string(),
                "Exames de Sangue".to_string(),
                "Exames de Urina".to_string(),
                "Exames Hormonais".to_string(),
                "Exames Cardiológicos".to_string(),
                "Check-up Completo".to_string(),
            ],
            convenios: vec![
                "SUS - Sistema Único de Saúde".to_string(),
                "Unimed".to_string(),
                "Bradesco Saúde".to_string(),
                "Amil".to_string(),
                "SulAmérica".to_string(),
                "Particular".to_string(),
            ],
        }
    }
}

/// A leniently-parsed content record used when reading the store.
///
/// Every field is optional and unknown fields are ignored, so a snapshot
/// written by an older shell (or hand-edited) still loads; missing or empty
/// fields fall back to the default record field-by-field.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialSiteContent {
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub working_hours: Option<PartialWorkingHours>,
    pub social_media: Option<PartialSocialMedia>,
    pub home_title: Option<String>,
    pub home_subtitle: Option<String>,
    pub about_text: Option<String>,
    pub mission_text: Option<String>,
    pub services: Option<Vec<String>>,
    pub convenios: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PartialWorkingHours {
    pub weekdays: Option<String>,
    pub saturday: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PartialSocialMedia {
    pub instagram: Option<String>,
    pub facebook: Option<String>,
}

fn or_default(value: Option<String>, fallback: String) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => fallback,
    }
}

impl SiteContent {
    /// Merges a leniently-parsed record over the defaults.
    pub fn from_partial(partial: PartialSiteContent) -> Self {
        let defaults = Self::default();
        let hours = partial.working_hours.unwrap_or_default();
        let social = partial.social_media.unwrap_or_default();

        Self {
            phone: or_default(partial.phone, defaults.phone),
            whatsapp: or_default(partial.whatsapp, defaults.whatsapp),
            email: or_default(partial.email, defaults.email),
            address: or_default(partial.address, defaults.address),
            working_hours: WorkingHours {
                weekdays: or_default(hours.weekdays, defaults.working_hours.weekdays),
                saturday: or_default(hours.saturday, defaults.working_hours.saturday),
            },
            social_media: SocialMedia {
                // Empty social links are an explicit choice, not an absence.
                instagram: social.instagram.unwrap_or(defaults.social_media.instagram),
                facebook: social.facebook.unwrap_or(defaults.social_media.facebook),
            },
            home_title: or_default(partial.home_title, defaults.home_title),
            home_subtitle: or_default(partial.home_subtitle, defaults.home_subtitle),
            about_text: or_default(partial.about_text, defaults.about_text),
            mission_text: or_default(partial.mission_text, defaults.mission_text),
            services: match partial.services {
                Some(list) if !list.is_empty() => list,
                _ => defaults.services,
            },
            convenios: match partial.convenios {
                Some(list) if !list.is_empty() => list,
                _ => defaults.convenios,
            },
        }
    }
}
