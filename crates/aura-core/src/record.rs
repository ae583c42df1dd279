//! Medical analysis records and their AI diagnosis.

use crate::reconcile::TrackedSnapshot;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::Infallible;
use std::str::FromStr;
use std::sync::LazyLock;

/// Processing state of an uploaded scan.
///
/// The backend reports it in several spellings (Vietnamese and English);
/// anything else is rejected so the snapshot counts as malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum AnalysisStatus {
    #[strum(serialize = "Đang xử lý")]
    Pending,
    #[strum(serialize = "Hoàn thành")]
    Completed,
    #[strum(serialize = "Lỗi")]
    Failed,
}

impl AnalysisStatus {
    /// Monotonic rank used as the record version.
    pub fn rank(self) -> u8 {
        match self {
            AnalysisStatus::Pending => 0,
            AnalysisStatus::Failed => 1,
            AnalysisStatus::Completed => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AnalysisStatus::Completed | AnalysisStatus::Failed)
    }
}

impl FromStr for AnalysisStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        match trimmed {
            "Hoàn thành" => return Ok(AnalysisStatus::Completed),
            "Đang xử lý" => return Ok(AnalysisStatus::Pending),
            "Lỗi" => return Ok(AnalysisStatus::Failed),
            _ => {}
        }
        match trimmed.to_ascii_uppercase().as_str() {
            "COMPLETED" => Ok(AnalysisStatus::Completed),
            "PENDING" => Ok(AnalysisStatus::Pending),
            "FAILED" => Ok(AnalysisStatus::Failed),
            _ => Err(format!("unknown analysis status '{}'", raw)),
        }
    }
}

impl Serialize for AnalysisStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AnalysisStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One medical record (`GET /medical-records/{id}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: String,
    pub status: AnalysisStatus,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub annotated_image_url: Option<String>,
    #[serde(default)]
    pub doctor_note: Option<String>,
}

impl MedicalRecord {
    /// Parsed AI diagnosis, once a result text is present.
    pub fn diagnosis(&self) -> Option<Diagnosis> {
        self.result.as_deref().map(Diagnosis::parse)
    }

    pub fn severity(&self) -> Severity {
        match self.diagnosis() {
            Some(diagnosis) => Severity::classify(&diagnosis),
            None => Severity::Unknown,
        }
    }

    /// Whether the annotated image may be shown.
    pub fn has_annotation(&self) -> bool {
        self.status == AnalysisStatus::Completed
            && self
                .annotated_image_url
                .as_deref()
                .is_some_and(|url| !url.is_empty())
    }

    /// Image to display for the given mode, falling back to the original.
    pub fn image_for(&self, mode: ImageMode) -> Option<&str> {
        match mode {
            ImageMode::Annotated if self.has_annotation() => self.annotated_image_url.as_deref(),
            _ => self.image_url.as_deref(),
        }
    }
}

impl TrackedSnapshot for MedicalRecord {
    type Version = u8;
    type Mutation = Infallible;

    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> u8 {
        self.status.rank()
    }

    fn reflects(&self, mutation: &Infallible) -> bool {
        match *mutation {}
    }

    fn apply(&self, mutation: &Infallible) -> Self {
        match *mutation {}
    }

    fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

static CONFIDENCE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([\d.]+)%\)").expect("valid confidence pattern"));

/// An AI diagnosis split into label and confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnosis {
    pub label: String,
    /// Percentage in `0..=100`, when the model reported one.
    pub confidence: Option<f64>,
}

impl Diagnosis {
    /// Parses result text such as `"Bình thường (No DR) (98.54%)"`.
    pub fn parse(result: &str) -> Self {
        let result = result.trim();
        if result.contains(" (") && result.ends_with("%)") {
            let confidence = CONFIDENCE_PATTERN
                .captures(result)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<f64>().ok());
            let label = result.split(" (").next().unwrap_or_default();
            return Self {
                label: label.to_string(),
                confidence,
            };
        }
        Self {
            label: result.to_string(),
            confidence: None,
        }
    }

    /// Severe findings that need a doctor's attention.
    pub fn is_severe(&self) -> bool {
        is_severe_text(&self.label)
    }
}

/// True for result text naming a severe or proliferative stage.
pub fn is_severe_text(text: &str) -> bool {
    text.contains("Nặng") || text.contains("Tăng sinh")
}

/// Triage level derived from a diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
pub enum Severity {
    /// Low confidence; retake or consult.
    #[strum(serialize = "Cần kiểm tra kỹ")]
    Uncertain,
    #[strum(serialize = "Chưa rõ")]
    Unknown,
    #[strum(serialize = "Nguy hiểm")]
    Danger,
    #[strum(serialize = "Cảnh báo")]
    Warning,
    #[strum(serialize = "Lưu ý")]
    Caution,
    #[strum(serialize = "An toàn")]
    Safe,
}

impl Severity {
    pub fn classify(diagnosis: &Diagnosis) -> Self {
        if let Some(confidence) = diagnosis.confidence
            && confidence > 0.0
            && confidence < 60.0
        {
            return Severity::Uncertain;
        }
        let label = diagnosis.label.as_str();
        if label.is_empty() {
            Severity::Unknown
        } else if is_severe_text(label) {
            Severity::Danger
        } else if label.contains("Trung bình") {
            Severity::Warning
        } else if label.contains("Nhẹ") {
            Severity::Caution
        } else {
            Severity::Safe
        }
    }

    /// Patient-facing guidance for a diagnosis. Empty when there is no label.
    pub fn advice(diagnosis: &Diagnosis) -> String {
        match Self::classify(diagnosis) {
            Severity::Uncertain => format!(
                "⚠️ AI phát hiện dấu hiệu nghi ngờ nhưng độ tin cậy thấp ({:.1}%). \
                 Kết quả này có thể bị nhiễu do chất lượng ảnh hoặc ánh sáng. \
                 Vui lòng chụp lại rõ nét hơn hoặc tham vấn bác sĩ.",
                diagnosis.confidence.unwrap_or_default()
            ),
            Severity::Unknown => String::new(),
            Severity::Danger => "⚠️ CẢNH BÁO: Phát hiện tổn thương nghiêm trọng. \
                 Bạn cần đến bệnh viện chuyên khoa mắt để được điều trị laser hoặc tiêm thuốc ngay lập tức."
                .to_string(),
            Severity::Warning => "⚠️ Phát hiện tổn thương mức độ trung bình. \
                 Cần đặt lịch khám sớm để bác sĩ lên phác đồ điều trị ngăn chặn tiến triển."
                .to_string(),
            Severity::Caution => "ℹ️ Phát hiện dấu hiệu bệnh nhẹ. \
                 Bạn nên kiểm soát đường huyết chặt chẽ và tái khám sau 3 tháng."
                .to_string(),
            Severity::Safe => "✅ Võng mạc khỏe mạnh. Tuyệt vời! \
                 Hãy duy trì thói quen kiểm tra định kỳ 6 tháng/lần."
                .to_string(),
        }
    }
}

/// Eye and systemic risks associated with a diagnosed stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MedicalInsights {
    pub eye_risks: &'static [&'static str],
    pub systemic_risks: &'static [&'static str],
    pub prognosis: &'static str,
}

const SEVERE_INSIGHTS: MedicalInsights = MedicalInsights {
    eye_risks: &[
        "Nguy cơ bong võng mạc và mù lòa vĩnh viễn.",
        "Xuất huyết dịch kính và tăng nhãn áp tân mạch.",
    ],
    systemic_risks: &[
        "🔴 TIỂU ĐƯỜNG: Biến chứng đã lan rộng, nguy cơ cao suy thận.",
        "🔴 TIM MẠCH: Huyết áp cao mãn tính đã gây tổn thương thành mạch nghiêm trọng.",
        "🔴 THẦN KINH: Nguy cơ Đột quỵ (Tai biến) rất cao do tắc nghẽn vi mạch não.",
    ],
    prognosis: "Giai đoạn muộn. Bệnh đã tiến triển âm thầm từ lâu. \
                Cần can thiệp y tế khẩn cấp để bảo toàn chức năng các cơ quan.",
};

const MODERATE_INSIGHTS: MedicalInsights = MedicalInsights {
    eye_risks: &[
        "Phù hoàng điểm gây giảm thị lực trung tâm.",
        "Xuất hiện các ổ xuất huyết và xuất tiết cứng.",
    ],
    systemic_risks: &[
        "🟠 TIỂU ĐƯỜNG: Đường huyết (HbA1c) dao động mạnh, kiểm soát chưa hiệu quả.",
        "🟠 TIM MẠCH: Dấu hiệu xơ cứng mạch máu, nguy cơ tăng huyết áp ẩn giấu.",
        "🟠 THẦN KINH: Có dấu hiệu thiếu máu cục bộ, ảnh hưởng tuần hoàn não.",
    ],
    prognosis: "Bệnh đang tiến triển. \
                Cần điều chỉnh lối sống và thuốc ngay để ngăn chặn biến chứng lên tim và não.",
};

const MILD_INSIGHTS: MedicalInsights = MedicalInsights {
    eye_risks: &[
        "Vi phình mạch (Microaneurysms) bắt đầu xuất hiện.",
        "Thị lực chưa bị ảnh hưởng rõ rệt.",
    ],
    systemic_risks: &[
        "🟡 TIỂU ĐƯỜNG: Giai đoạn khởi phát biến chứng mạch máu.",
        "🟡 TIM MẠCH: Cần tầm soát rối loạn mỡ máu và huyết áp sớm.",
        "🟡 THẦN KINH: Chưa có nguy cơ cấp tính, nhưng cần theo dõi định kỳ.",
    ],
    prognosis: "Phát hiện sớm thành công! Đây là thời điểm vàng để thay đổi chế độ ăn uống \
                và ngăn chặn bệnh tiến triển âm thầm.",
};

const HEALTHY_INSIGHTS: MedicalInsights = MedicalInsights {
    eye_risks: &["Hệ thống mạch máu võng mạc khỏe mạnh."],
    systemic_risks: &[
        "🟢 Không phát hiện dấu hiệu tổn thương mạch máu nhỏ.",
        "🟢 Nguy cơ biến chứng Tim mạch/Thần kinh liên quan đến mắt: THẤP.",
        "ℹ️ Tiếp tục duy trì lối sống lành mạnh.",
    ],
    prognosis: "Tốt. Hãy duy trì thói quen khám sàng lọc 6 tháng/lần \
                để phát hiện sớm các rủi ro tiềm ẩn.",
};

impl MedicalInsights {
    /// Insights for the diagnosed stage. Confidence is not considered.
    pub fn for_diagnosis(diagnosis: &Diagnosis) -> Option<Self> {
        let label = diagnosis.label.as_str();
        if label.is_empty() {
            None
        } else if diagnosis.is_severe() {
            Some(SEVERE_INSIGHTS)
        } else if label.contains("Trung bình") {
            Some(MODERATE_INSIGHTS)
        } else if label.contains("Nhẹ") {
            Some(MILD_INSIGHTS)
        } else {
            Some(HEALTHY_INSIGHTS)
        }
    }
}

/// Which image the result view shows. UI-only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImageMode {
    #[default]
    Original,
    Annotated,
}
