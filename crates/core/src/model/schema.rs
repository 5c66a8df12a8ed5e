//! Api names of the content models and elements this crate understands.

pub const DEFAULT_LOCALE: &str = "en";

pub mod models {
    pub const COURSES: &str = "entry_type__courses";
    pub const SECTIONS: &str = "entry_type__sections";
    pub const LESSONS: &str = "entry_type__lessons";
    pub const LESSON_CATEGORIES: &str = "entry_type__lesson_categories";
    pub const PAGES: &str = "entry_type__pages";
    pub const QUIZZES: &str = "entry_type__quizzes";
    pub const QUESTIONS: &str = "entry_type__questions";
    pub const QUESTION_ANSWERS: &str = "entry_type__question_answers";
    pub const LEARNING_PATHS: &str = "entry_type__learning_paths";
    pub const USER_PROGRESS: &str = "entry_type__user_progress";
}

pub mod elements {
    // courses
    pub const SECTIONS: &str = "element__sections__entry";
    pub const COURSE_DURATION: &str = "element__course_duration__number";
    pub const COURSE_DESCRIPTION: &str = "element__course_description__text";
    pub const COURSE_BANNER: &str = "element__course_banner__text";
    pub const COURSE_BANNER_NAME: &str = "element__course_banner_name__text";
    pub const COURSE_ROLE_ID: &str = "element__course_role_id__text";
    pub const COURSE_ORDER: &str = "element__course_order__text";

    // sections
    pub const LESSONS: &str = "element__lessons__entry";
    pub const SECTION_DESCRIPTION: &str = "element__section_description__text";

    // lessons
    pub const LESSON_PAGES: &str = "element__lesson_pages__entry";
    pub const LESSON_CATEGORIES: &str = "element__lesson_categories__entry";
    pub const LESSON_ORDER: &str = "element__lesson_order__text";
    pub const LESSON_DESCRIPTION: &str = "element__lesson_description__text";

    // pages
    pub const QUIZZES: &str = "element__quizzes__entry";

    // quizzes and questions
    pub const QUESTIONS: &str = "element__questions__entry";
    pub const QUESTION_ANSWERS: &str = "element__question_answers__entry";
    pub const VARIANTS_OF_ANSWERS: &str = "element__variants_of_answers__text";
    pub const CORRECT_ANSWERS: &str = "element__correct_answers__text";
    pub const USER: &str = "element__user__user";

    // learning paths
    pub const COURSES: &str = "element__courses__entry";
    pub const LP_DESCRIPTION: &str = "element__lp_description__text";

    // progress records
    pub const CURRENT_ENTRY_ID: &str = "element__current_entry_id__text";
    pub const PROGRESS_PERCENT: &str = "element__progress_percent__number";
}
