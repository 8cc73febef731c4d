//! SeaORM entity models
//!
//! Database entities for the Rollcall attendance schema

mod attendance;
mod class;
mod session;
mod student;
mod subject;
mod teacher;
mod teacher_subject;
mod user;

pub use user::{
    Entity as UserEntity,
    Model as User,
    ActiveModel as UserActiveModel,
    Column as UserColumn,
};

pub use class::{
    Entity as ClassEntity,
    Model as Class,
    ActiveModel as ClassActiveModel,
    Column as ClassColumn,
};

pub use subject::{
    Entity as SubjectEntity,
    Model as Subject,
    ActiveModel as SubjectActiveModel,
    Column as SubjectColumn,
};

pub use teacher::{
    Entity as TeacherEntity,
    Model as Teacher,
    ActiveModel as TeacherActiveModel,
    Column as TeacherColumn,
};

pub use teacher_subject::{
    Entity as TeacherSubjectEntity,
    Model as TeacherSubject,
    ActiveModel as TeacherSubjectActiveModel,
    Column as TeacherSubjectColumn,
};

pub use student::{
    Entity as StudentEntity,
    Model as Student,
    ActiveModel as StudentActiveModel,
    Column as StudentColumn,
};

pub use session::{
    generate_code,
    Entity as SessionEntity,
    Model as Session,
    ActiveModel as SessionActiveModel,
    Column as SessionColumn,
};

pub use attendance::{
    Entity as AttendanceEntity,
    Model as Attendance,
    ActiveModel as AttendanceActiveModel,
    Column as AttendanceColumn,
    STATUS_PRESENT,
};
